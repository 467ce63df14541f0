use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use crate::commands::two_up::TwoUpOptions;
use crate::layout::{check_offsets, CropSpec};
use crate::page_range::PageSelection;

#[derive(Parser, Debug)]
#[command(name = "twoup")]
#[command(about = "Crop page margins and print two PDF pages per landscape A4 sheet")]
#[command(version)]
pub struct Cli {
    /// Source PDF file
    pub input: PathBuf,

    /// Output PDF file
    pub output: PathBuf,

    /// Percentage to crop from the top margin
    #[arg(
        long = "crop_top",
        alias = "crop-top",
        value_name = "PERCENT",
        default_value_t = 0.0,
        allow_negative_numbers = true
    )]
    pub crop_top: f64,

    /// Percentage to crop from the bottom margin
    #[arg(
        long = "crop_bottom",
        alias = "crop-bottom",
        value_name = "PERCENT",
        default_value_t = 0.0,
        allow_negative_numbers = true
    )]
    pub crop_bottom: f64,

    /// Percentage to crop from the left margin
    #[arg(
        long = "crop_left",
        alias = "crop-left",
        value_name = "PERCENT",
        default_value_t = 0.0,
        allow_negative_numbers = true
    )]
    pub crop_left: f64,

    /// Percentage to crop from the right margin
    #[arg(
        long = "crop_right",
        alias = "crop-right",
        value_name = "PERCENT",
        default_value_t = 0.0,
        allow_negative_numbers = true
    )]
    pub crop_right: f64,

    /// Horizontal shift in points (positive is right)
    #[arg(
        long = "x_offset",
        alias = "x-offset",
        value_name = "POINTS",
        default_value_t = 0.0,
        allow_negative_numbers = true
    )]
    pub x_offset: f64,

    /// Vertical shift in points (positive is up)
    #[arg(
        long = "y_offset",
        alias = "y-offset",
        value_name = "POINTS",
        default_value_t = 0.0,
        allow_negative_numbers = true
    )]
    pub y_offset: f64,

    /// Skew horizontal cropping toward the gutter (1.0 = none, range 0-2)
    #[arg(
        long = "gutter_bias",
        alias = "gutter-bias",
        value_name = "FACTOR",
        default_value_t = 1.0,
        allow_negative_numbers = true
    )]
    pub gutter_bias: f64,

    /// Page ranges to impose, in order (e.g., "1-5,10,15-end")
    #[arg(short, long)]
    pub pages: Option<String>,

    /// Print the computed layout as JSON instead of writing the output
    #[arg(long)]
    pub dry_run: bool,
}

impl Cli {
    /// Validate the flags into imposition options
    pub fn options(&self) -> Result<TwoUpOptions> {
        let crop = CropSpec::new(
            self.crop_top,
            self.crop_bottom,
            self.crop_left,
            self.crop_right,
            self.gutter_bias,
        )?;
        let (x_offset, y_offset) = check_offsets(self.x_offset, self.y_offset)?;

        let pages = match &self.pages {
            Some(ranges) => PageSelection::parse(ranges)?,
            None => PageSelection::All,
        };

        Ok(TwoUpOptions {
            crop,
            x_offset,
            y_offset,
            pages,
            dry_run: self.dry_run,
        })
    }
}
