// SPDX-License-Identifier: MIT

//! Upload/download container formats (§6 "File formats for upload/download").

/// Byte-stream container wrapping the delimited record text (§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    #[default]
    Text,
    Gzip,
    /// Single-entry zip container; the first (and for download, only) entry
    /// carries the delimited record text.
    Zip,
}

stratum_core::simple_display! {
    Format {
        Text => "text",
        Gzip => "gzip",
        Zip => "zip",
    }
}
