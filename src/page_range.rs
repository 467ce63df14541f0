use anyhow::{anyhow, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRange {
    pub start: PageRef,
    pub end: Option<PageRef>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageRef {
    Number(u32),
    End,
}

impl PageRange {
    /// Parse a page range specification like "1-5", "9-6", "1-end", "end"
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(anyhow!("Empty page range"));
        }

        match s.split_once('-') {
            // "-5" is not a range
            Some(("", _)) => Err(anyhow!("Invalid page range: {}", s)),
            Some((start, end)) => Ok(PageRange {
                start: parse_page_ref(start)?,
                end: Some(parse_page_ref(end)?),
            }),
            None => Ok(PageRange {
                start: parse_page_ref(s)?,
                end: None,
            }),
        }
    }

    /// Expand this range into a list of 1-based page numbers
    pub fn expand(&self, total_pages: u32) -> Result<Vec<u32>> {
        let resolve = |page: &PageRef| match page {
            PageRef::Number(n) => *n,
            PageRef::End => total_pages,
        };

        let start = resolve(&self.start);
        let end = self.end.as_ref().map(resolve).unwrap_or(start);

        if start == 0 || end == 0 {
            return Err(anyhow!("Page numbers must be >= 1"));
        }

        for page in [start, end] {
            if page > total_pages {
                return Err(anyhow!(
                    "Page {} exceeds total pages {}",
                    page,
                    total_pages
                ));
            }
        }

        let pages: Vec<u32> = if start <= end {
            (start..=end).collect()
        } else {
            (end..=start).rev().collect()
        };

        Ok(pages)
    }
}

fn parse_page_ref(s: &str) -> Result<PageRef> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("end") {
        Ok(PageRef::End)
    } else {
        s.parse::<u32>()
            .map(PageRef::Number)
            .map_err(|_| anyhow!("Invalid page number: {}", s))
    }
}

/// Which source pages go into the imposed sequence, and in what order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PageSelection {
    #[default]
    All,
    Ranges(Vec<PageRange>),
}

impl PageSelection {
    /// Parse a comma-separated list of page ranges like "1-5,10,15-end"
    pub fn parse(s: &str) -> Result<Self> {
        let ranges = s
            .split(',')
            .map(PageRange::parse)
            .collect::<Result<Vec<_>>>()?;
        Ok(PageSelection::Ranges(ranges))
    }

    /// Resolve to 1-based page numbers against a document of `total_pages`
    pub fn resolve(&self, total_pages: u32) -> Result<Vec<u32>> {
        let pages = match self {
            PageSelection::All => (1..=total_pages).collect(),
            PageSelection::Ranges(ranges) => {
                let mut pages = Vec::new();
                for range in ranges {
                    pages.extend(range.expand(total_pages)?);
                }
                pages
            }
        };

        if pages.is_empty() {
            return Err(anyhow!("No pages selected"));
        }

        Ok(pages)
    }
}
