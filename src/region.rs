//! Marker-delimited regions of generated files.
//!
//! Generated files carry pairs of comment markers. On regeneration only the
//! text strictly between a begin marker and its end marker is replaced, so
//! code written by hand around the regions survives. Regions must appear in
//! the order their marker set lists them and must not overlap.

use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use crate::error::RegionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub name: &'static str,
    pub begin: &'static str,
    pub end: &'static str,
}

pub const IMPORT: Region = Region {
    name: "import",
    begin: "// AutoGenImportBegin {",
    end: "// } AutoGenImportEnd",
};

pub const BOOTSTRAP: Region = Region {
    name: "bootstrap",
    begin: "  // AutoGenBootstrapBegin {",
    end: "  // } AutoGenBootstrapEnd",
};

pub const EXPORT: Region = Region {
    name: "export",
    begin: "  // AutoGenExportBegin {",
    end: "  // } AutoGenExportEnd",
};

// The misspelling is load-bearing: files generated so far carry it.
pub const INTERFACE_ATTRS: Region = Region {
    name: "interface-attrs",
    begin: "  // AutoGenIntefaceAttrBegin {",
    end: "  // } AutoGenIntefaceAttrEnd",
};

pub const MODEL_ATTRS: Region = Region {
    name: "model-attrs",
    begin: "  // AutoGenModelAttrsBegin {",
    end: "  // } AutoGenModelAttrsEnd",
};

pub const COLUMN_DEFS: Region = Region {
    name: "column-defs",
    begin: "        // AutoGenColumnDefsBegin {",
    end: "        // } AutoGenColumnDefsEnd",
};

/// Regions of `index.ts`, in file order.
pub const INDEX_REGIONS: [Region; 3] = [IMPORT, BOOTSTRAP, EXPORT];

/// Regions of a per-table model file, in file order.
pub const MODEL_REGIONS: [Region; 3] = [INTERFACE_ATTRS, MODEL_ATTRS, COLUMN_DEFS];

/// Freshly rendered region bodies keyed by region name.
pub type Fragments = FxHashMap<&'static str, String>;

#[derive(Debug, Clone, Copy)]
struct Span {
    region: Region,
    /// Offset of the begin marker.
    begin: usize,
    /// Offset of the end marker.
    end: usize,
}

impl Span {
    fn stop(&self) -> usize {
        self.end + self.region.end.len()
    }
}

fn locate(region: Region, text: &str) -> Result<Option<Span>, RegionError> {
    let Some(begin) = text.find(region.begin) else {
        warn!(region = region.name, "begin marker not found, region left untouched");
        return Ok(None);
    };

    let body = begin + region.begin.len();
    if text[body..].contains(region.begin) {
        return Err(RegionError::DuplicateMarker {
            marker: region.begin,
        });
    }

    let Some(offset) = text[body..].find(region.end) else {
        if text[..begin].contains(region.end) {
            return Err(RegionError::EndBeforeBegin {
                region: region.name,
            });
        }

        warn!(region = region.name, "end marker not found, region left untouched");
        return Ok(None);
    };

    let span = Span {
        region,
        begin,
        end: body + offset,
    };
    if text[span.stop()..].contains(region.end) || text[..begin].contains(region.end) {
        return Err(RegionError::DuplicateMarker { marker: region.end });
    }

    Ok(Some(span))
}

fn locate_all(regions: &[Region], text: &str) -> Result<Vec<Span>, RegionError> {
    let mut spans: Vec<Span> = Vec::with_capacity(regions.len());
    for region in regions {
        let Some(span) = locate(*region, text)? else {
            continue;
        };

        if let Some(prev) = spans.last() {
            if span.begin < prev.begin {
                return Err(RegionError::OutOfOrder {
                    region: span.region.name,
                    after: prev.region.name,
                });
            }

            if span.begin < prev.stop() {
                return Err(RegionError::Overlap {
                    first: prev.region.name,
                    second: span.region.name,
                });
            }
        }

        spans.push(span);
    }

    Ok(spans)
}

/// Replaces the body of every region found in `text` with its fragment.
///
/// A region whose markers are missing is skipped, as is a region with no
/// fragment. Everything outside the marker pairs is copied unchanged.
pub fn merge(regions: &[Region], fragments: &Fragments, text: &str) -> Result<String, RegionError> {
    let spans = locate_all(regions, text)?;
    let mut merged = String::with_capacity(text.len());
    let mut cursor = 0;
    for span in spans {
        let Some(fragment) = fragments.get(span.region.name) else {
            continue;
        };

        debug!(region = span.region.name, "replacing region");
        merged.push_str(&text[cursor..span.begin]);
        merged.push_str(span.region.begin);
        merged.push('\n');
        merged.push_str(fragment);
        cursor = span.end;
    }

    merged.push_str(&text[cursor..]);
    Ok(merged)
}

/// A region with its markers, laid out exactly as `merge` leaves it. The
/// result ends with the end marker, without a newline.
pub fn wrap(region: Region, fragment: &str) -> String {
    format!("{}\n{fragment}{}", region.begin, region.end)
}
