//! Image + profile + config -> hook table -> patched image.

use std::fmt;

use crate::asm::BuildError;
use crate::config::{Config, ConfigError};
use crate::image::Image;
use crate::layout::{Layout, Region};
use crate::memory::map::HookSite;
use crate::memory::Profile;
use crate::patch::{self, AppliedSet, HookDescriptor, HookTable, PatchError};
use crate::routines;

#[derive(Debug)]
pub enum InstallError {
    Config(ConfigError),
    Build(BuildError),
    Patch(PatchError),
    /// A hook site is outside the CPU-visible PRG.
    SiteNotMapped(&'static str, usize),
}

impl fmt::Display for InstallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstallError::Config(e) => write!(f, "config: {e}"),
            InstallError::Build(e) => write!(f, "build: {e}"),
            InstallError::Patch(e) => write!(f, "patch: {e}"),
            InstallError::SiteNotMapped(name, offset) => {
                write!(f, "{name} at {offset:#06X} is not in the CPU-visible PRG")
            }
        }
    }
}

impl std::error::Error for InstallError {}

impl From<ConfigError> for InstallError {
    fn from(e: ConfigError) -> Self {
        InstallError::Config(e)
    }
}

impl From<BuildError> for InstallError {
    fn from(e: BuildError) -> Self {
        InstallError::Build(e)
    }
}

impl From<PatchError> for InstallError {
    fn from(e: PatchError) -> Self {
        InstallError::Patch(e)
    }
}

/// The free region for this image, honouring a config override.
pub fn free_region(image: &Image, profile: &Profile, config: &Config) -> Result<Region, BuildError> {
    let (start, end) = config
        .free_region
        .map_or(profile.free_region, |r| (r.start, r.end));
    Region::new(image, start, end)
}

fn site_hook(
    image: &Image,
    layout: &Layout,
    site: &HookSite,
    name: &'static str,
    stub: crate::asm::Routine,
) -> Result<HookDescriptor, InstallError> {
    let origin = image
        .cpu_address(site.offset)
        .ok_or(InstallError::SiteNotMapped(name, site.offset))?;
    Ok(HookDescriptor {
        address: site.offset,
        original_bytes: site.original.to_vec(),
        replacement_bytes: layout.link(&stub, origin)?,
        routine_ref: name.to_string(),
    })
}

/// Generate, place and link every routine and call-site stub, and
/// describe the result as hooks against `image`. Writes nothing.
pub fn build_table(image: &Image, profile: &Profile, config: &Config) -> Result<HookTable, InstallError> {
    config.validate()?;
    let fill = config.free_fill.unwrap_or(profile.free_fill);

    let routines = routines::all(&profile.memory, config)?;
    let region = free_region(image, profile, config)?;
    let layout = Layout::allocate(region, &routines)?;
    let region = layout.region();
    log::info!(
        "Free region {:#06X}..{:#06X} at ${:04X}, {} bytes",
        region.start,
        region.end,
        region.base,
        region.len()
    );

    let mut hooks = Vec::with_capacity(routines.len() + 2);
    for ((placement, code), routine) in layout.link_placed(&routines)?.into_iter().zip(&routines) {
        log::info!(
            "{:<8} {:#06X} ({:#06X}) {:>3}/{} bytes, <= {} cycles",
            placement.name,
            placement.address,
            placement.offset,
            code.len(),
            placement.slot,
            routine.cycle_bound
        );
        hooks.push(HookDescriptor {
            address: placement.offset,
            original_bytes: vec![fill; code.len()],
            replacement_bytes: code,
            routine_ref: placement.name.to_string(),
        });
    }

    hooks.push(site_hook(
        image,
        &layout,
        &profile.input_site,
        routines::INPUT_SITE,
        routines::input_site(&profile.input_site)?,
    )?);
    hooks.push(site_hook(
        image,
        &layout,
        &profile.mode_select_site,
        routines::MODE_SELECT_SITE,
        routines::mode_select_site(&profile.mode_select_site)?,
    )?);

    Ok(HookTable {
        profile: profile.name.to_string(),
        image_md5: image.md5(),
        hooks,
    })
}

/// Build the hook table for `image` and apply it.
pub fn install(image: &mut Image, profile: &Profile, config: &Config) -> Result<AppliedSet, InstallError> {
    let table = build_table(image, profile, config)?;
    apply_table(image, &table)
}

/// Apply a previously built table. The byte check decides; a different
/// MD5 only means some unhooked byte differs from the table's image.
pub fn apply_table(image: &mut Image, table: &HookTable) -> Result<AppliedSet, InstallError> {
    let found = image.md5();
    if found != table.image_md5 {
        log::warn!(
            "Hook table was built for {}, this image is {found}",
            table.image_md5
        );
    }
    let applied = patch::apply(image, &table.hooks)?;
    log::info!(
        "Patched {} bytes in {} hooks: {} -> {}",
        applied.bytes_written(),
        applied.hooks.len(),
        applied.md5_before,
        applied.md5_after
    );
    Ok(applied)
}
