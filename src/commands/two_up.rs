use anyhow::{Context, Result};
use lopdf::{Document, ObjectId};
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::layout::{layout_page, CropSpec, PageGeometry, PagePlacement};
use crate::page_range::PageSelection;
use crate::pdf::sheet::SheetWriter;
use crate::pdf::PdfDocument;

#[derive(Debug, Clone, Default)]
pub struct TwoUpOptions {
    pub crop: CropSpec,
    pub x_offset: f64,
    pub y_offset: f64,
    pub pages: PageSelection,
    pub dry_run: bool,
}

#[derive(Debug, Serialize)]
pub struct PlannedPage {
    pub page: u32,
    #[serde(skip)]
    pub id: ObjectId,
    pub geometry: PageGeometry,
    pub placement: PagePlacement,
}

#[derive(Debug, Serialize)]
pub struct SheetPlan {
    pub sheet: u32,
    pub pages: Vec<PlannedPage>,
}

#[derive(Debug, Serialize)]
pub struct LayoutPlan {
    pub source: String,
    pub crop: CropSpec,
    pub sheets: Vec<SheetPlan>,
}

impl LayoutPlan {
    pub fn page_count(&self) -> usize {
        self.sheets.iter().map(|sheet| sheet.pages.len()).sum()
    }
}

pub fn run<P: AsRef<Path>, Q: AsRef<Path>>(
    input: P,
    output: Q,
    options: &TwoUpOptions,
) -> Result<()> {
    let doc = PdfDocument::open(&input)?;
    let layout = plan(&doc, options)?;

    if options.dry_run {
        println!("{}", serde_json::to_string_pretty(&layout)?);
        return Ok(());
    }

    let mut imposed = impose(&doc, &layout)?;
    PdfDocument::save(&mut imposed, &output)?;

    println!(
        "Imposed {} page(s) onto {} sheet(s) in {}",
        layout.page_count(),
        layout.sheets.len(),
        output.as_ref().display()
    );

    Ok(())
}

/// Compute crop and placement for every selected page, two per sheet
pub fn plan(doc: &PdfDocument, options: &TwoUpOptions) -> Result<LayoutPlan> {
    let selected = options.pages.resolve(doc.page_count())?;
    let edges = options.crop.edges();

    info!(
        source = %doc.path,
        pages = selected.len(),
        top = edges.top,
        bottom = edges.bottom,
        left = edges.left,
        right = edges.right,
        gutter_bias = options.crop.gutter_bias(),
        "planning two-up layout"
    );

    let mut sheets = Vec::with_capacity(selected.len().div_ceil(2));

    for (sheet_index, pair) in selected.chunks(2).enumerate() {
        let mut pages = Vec::with_capacity(2);

        for (offset, &page) in pair.iter().enumerate() {
            let slot = (sheet_index * 2 + offset + 1) as u32;
            let id = doc.page_id(page)?;

            if doc.rotation(id) != 0 {
                warn!(page, rotation = doc.rotation(id), "page rotation is not applied");
            }

            let geometry = doc
                .page_geometry(id)
                .with_context(|| format!("Failed to read size of page {}", page))?;
            let placement = layout_page(
                &geometry,
                &options.crop,
                slot,
                (options.x_offset, options.y_offset),
            )
            .with_context(|| format!("Failed to lay out page {}", page))?;

            let origin = placement
                .transform
                .apply(placement.crop.x0, placement.crop.y0);
            debug!(
                page,
                slot,
                landscape = geometry.is_landscape(),
                half = ?placement.half,
                origin = ?origin,
                scale = placement.transform.scale,
                crop = ?placement.crop.as_array(),
                "placed page"
            );

            pages.push(PlannedPage {
                page,
                id,
                geometry,
                placement,
            });
        }

        sheets.push(SheetPlan {
            sheet: sheet_index as u32 + 1,
            pages,
        });
    }

    Ok(LayoutPlan {
        source: doc.path.clone(),
        crop: options.crop,
        sheets,
    })
}

/// Render a plan into a new document
pub fn impose(doc: &PdfDocument, plan: &LayoutPlan) -> Result<Document> {
    let mut writer = SheetWriter::new();

    for sheet in &plan.sheets {
        let pages: Vec<_> = sheet
            .pages
            .iter()
            .map(|planned| (planned.id, planned.placement))
            .collect();
        writer
            .add_sheet(doc, &pages)
            .with_context(|| format!("Failed to build sheet {}", sheet.sheet))?;
    }

    info!(sheets = writer.sheet_count(), "assembled output");
    Ok(writer.finish())
}
