//! Measurer – lays out every section fragment on the shared render surface
//! and records its height.
//!
//! The render surface is the one piece of shared mutable state in the
//! pipeline. Measurement, preview and export all go through a
//! [`SurfaceLease`], and at most one lease exists at a time. Whatever a lease
//! changes on the surface (forced print colours, the active preview page) is
//! put back when the lease drops, on every exit path.

use std::cell::Cell;
use std::fmt;

use crate::error::{Error, Result};
use crate::fonts::FontManager;
use crate::layout::measure_fragment;
use crate::pipeline::PageGeometry;
use crate::record::ResumeRecord;
use crate::section::{sections_for, LayoutConditions, MeasuredHeights};
use crate::templates::fragment_for;
use crate::variant::StyleVariant;

/// Who currently holds the render surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceOp {
    Measure,
    Preview,
    Export,
}

impl fmt::Display for SurfaceOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SurfaceOp::Measure => "measurement",
            SurfaceOp::Preview => "preview",
            SurfaceOp::Export => "export",
        })
    }
}

/// Colour handling applied while a surface is leased.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorOverride {
    /// Screen rendering; backgrounds may be dropped.
    #[default]
    None,
    /// Print-exact colours, backgrounds kept.
    PrintExact,
}

/// The off-screen area fragments are laid out against.
#[derive(Debug, Default)]
pub struct RenderSurface {
    geometry: Cell<Option<PageGeometry>>,
    owner: Cell<Option<SurfaceOp>>,
    color_override: Cell<ColorOverride>,
    active_page: Cell<Option<usize>>,
}

impl RenderSurface {
    /// A surface with no width yet; measuring against it fails with
    /// [`Error::MeasurementNotReady`].
    pub fn unmounted() -> Self {
        Self::default()
    }

    pub fn mounted(geometry: PageGeometry) -> Self {
        let s = Self::default();
        s.mount(geometry);
        s
    }

    pub fn mount(&self, geometry: PageGeometry) {
        self.geometry.set(Some(geometry));
    }

    pub fn unmount(&self) {
        self.geometry.set(None);
    }

    /// A geometry has been attached, usable or not.
    pub fn is_attached(&self) -> bool {
        self.geometry.get().is_some()
    }

    /// Mounted geometry with a usable content width.
    pub fn geometry(&self) -> Option<PageGeometry> {
        self.geometry.get().filter(|g| g.content_width() > 0.0)
    }

    pub fn is_mounted(&self) -> bool {
        self.geometry().is_some()
    }

    pub fn owner(&self) -> Option<SurfaceOp> {
        self.owner.get()
    }

    pub fn color_override(&self) -> ColorOverride {
        self.color_override.get()
    }

    pub fn active_page(&self) -> Option<usize> {
        self.active_page.get()
    }

    pub fn set_active_page(&self, page: Option<usize>) {
        self.active_page.set(page);
    }

    /// Take exclusive ownership for `op`.
    pub fn acquire(&self, op: SurfaceOp) -> Result<SurfaceLease<'_>> {
        if let Some(current) = self.owner.get() {
            log::debug!("surface busy with {current}, {op} refused");
            return Err(Error::SurfaceBusy(current));
        }
        self.owner.set(Some(op));
        Ok(SurfaceLease {
            surface: self,
            op,
            saved_override: self.color_override.get(),
            saved_page: self.active_page.get(),
        })
    }
}

/// Exclusive hold on a [`RenderSurface`]. Dropping it restores the colour
/// override and the active page and releases ownership.
#[derive(Debug)]
pub struct SurfaceLease<'a> {
    surface: &'a RenderSurface,
    op: SurfaceOp,
    saved_override: ColorOverride,
    saved_page: Option<usize>,
}

impl SurfaceLease<'_> {
    pub fn op(&self) -> SurfaceOp {
        self.op
    }

    pub fn surface(&self) -> &RenderSurface {
        self.surface
    }

    pub fn force_colors(&self, mode: ColorOverride) {
        self.surface.color_override.set(mode);
    }

    /// Show a different page for the duration of the lease.
    pub fn set_active_page(&self, page: usize) {
        self.surface.active_page.set(Some(page));
    }

    /// Backgrounds are painted only under print-exact colours.
    pub fn keep_backgrounds(&self) -> bool {
        self.surface.color_override.get() == ColorOverride::PrintExact
    }
}

impl Drop for SurfaceLease<'_> {
    fn drop(&mut self) {
        self.surface.color_override.set(self.saved_override);
        self.surface.active_page.set(self.saved_page);
        self.surface.owner.set(None);
    }
}

/// Measure every unit the paginator will need for `record` under `variant`.
///
/// Pure with respect to its inputs: the same record measured on the same
/// geometry with the same fonts yields identical heights.
pub fn measure(
    surface: &RenderSurface,
    record: &ResumeRecord,
    variant: StyleVariant,
    fonts: &FontManager,
) -> Result<MeasuredHeights> {
    let geometry = surface.geometry().ok_or(Error::MeasurementNotReady)?;
    let _lease = surface.acquire(SurfaceOp::Measure)?;

    let conditions = LayoutConditions {
        geometry,
        variant,
        font_fingerprint: fonts.fingerprint(),
    };
    let width = geometry.content_width();
    let sections = sections_for(record);
    let mut heights = MeasuredHeights::new(conditions);

    for key in MeasuredHeights::required_keys(&sections) {
        match fragment_for(record, variant, key) {
            Some(html) => heights.insert(key, measure_fragment(&html, width, fonts)?),
            None => log::warn!("no fragment for {key:?}; leaving it unmeasured"),
        }
    }

    log::debug!(
        "measured {} units for {} sections at {:.1}pt ({variant})",
        heights.len(),
        sections.len(),
        width
    );
    Ok(heights)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::section::HeightKey;
    use crate::section::SectionKind;

    #[test]
    fn unmounted_surface_defers() {
        let s = RenderSurface::unmounted();
        let r = ResumeRecord::sample();
        let err = measure(&s, &r, StyleVariant::Professional, &FontManager::default()).unwrap_err();
        assert!(matches!(err, Error::MeasurementNotReady));
    }

    #[test]
    fn zero_width_counts_as_unmounted() {
        let s = RenderSurface::mounted(PageGeometry {
            page_width: 80.0,
            page_height: 400.0,
            page_margin: 40.0,
        });
        assert!(!s.is_mounted());
    }

    #[test]
    fn only_one_lease_at_a_time() {
        let s = RenderSurface::mounted(PageGeometry::default());
        let lease = s.acquire(SurfaceOp::Export).unwrap();
        assert!(matches!(s.acquire(SurfaceOp::Preview), Err(Error::SurfaceBusy(SurfaceOp::Export))));
        let r = ResumeRecord::sample();
        assert!(matches!(
            measure(&s, &r, StyleVariant::Modern, &FontManager::default()),
            Err(Error::SurfaceBusy(_))
        ));
        drop(lease);
        assert!(s.acquire(SurfaceOp::Preview).is_ok());
    }

    #[test]
    fn lease_drop_restores_surface_state() {
        let s = RenderSurface::mounted(PageGeometry::default());
        s.set_active_page(Some(2));
        {
            let lease = s.acquire(SurfaceOp::Export).unwrap();
            lease.force_colors(ColorOverride::PrintExact);
            lease.set_active_page(5);
            assert!(lease.keep_backgrounds());
            assert_eq!(s.active_page(), Some(5));
        }
        assert_eq!(s.color_override(), ColorOverride::None);
        assert_eq!(s.active_page(), Some(2));
        assert_eq!(s.owner(), None);
    }

    #[test]
    fn measures_every_required_unit() {
        let s = RenderSurface::mounted(PageGeometry::default());
        let r = ResumeRecord::sample();
        let sections = sections_for(&r);
        let h = measure(&s, &r, StyleVariant::Professional, &FontManager::default()).unwrap();
        assert!(h.covers(&sections));
        assert!(h.get(HeightKey::PageHeader).unwrap() > h.get(HeightKey::ContinuationHeader).unwrap());
        assert!(h.get(HeightKey::Item(SectionKind::Experience, 0)).unwrap() > 0.0);
        assert_eq!(s.owner(), None);
    }

    #[test]
    fn measurement_is_repeatable() {
        let s = RenderSurface::mounted(PageGeometry::default());
        let r = ResumeRecord::sample();
        let f = FontManager::default();
        let a = measure(&s, &r, StyleVariant::Executive, &f).unwrap();
        let b = measure(&s, &r, StyleVariant::Executive, &f).unwrap();
        assert_eq!(a.conditions, b.conditions);
        for key in MeasuredHeights::required_keys(&sections_for(&r)) {
            assert_eq!(a.get(key), b.get(key));
        }
    }
}
