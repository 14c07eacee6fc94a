//! OAI-PMH `ListRecords` response parsing.
//!
//! A response is either a page of records with an optional
//! `resumptionToken`, or an embedded `<error>` document. The latter is a
//! failure even when it arrives with HTTP 200.

use crate::models::{RawRecord, RecordHeader};
use crate::xml::{parse_document, XmlElement};

/// The response body could not be used as a page of records.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("provider error {code}: {message}")]
    Provider { code: String, message: String },
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// One page of a `ListRecords` listing.
#[derive(Debug, Clone)]
pub struct RecordPage {
    pub records: Vec<RawRecord>,
    /// Continuation token; `None` when the listing is complete.
    pub resumption_token: Option<String>,
    /// `completeListSize` when the provider reports it.
    pub complete_list_size: Option<usize>,
}

pub fn parse_list_records(body: &str) -> Result<RecordPage, ProtocolError> {
    let root = parse_document(body).map_err(|e| ProtocolError::Malformed(e.to_string()))?;

    let error = if root.is("error") {
        Some(&root)
    } else {
        root.find("error")
    };
    if let Some(error) = error {
        return Err(ProtocolError::Provider {
            code: error.attr("code").unwrap_or("unknown").to_string(),
            message: error.text().unwrap_or_default().to_string(),
        });
    }

    let list = root
        .find("ListRecords")
        .ok_or_else(|| ProtocolError::Malformed("missing ListRecords element".to_string()))?;

    let records = list
        .children
        .iter()
        .filter(|c| c.is("record"))
        .map(record_from_element)
        .collect();

    let token_element = list.child("resumptionToken");
    let resumption_token = token_element.and_then(|t| t.text()).map(str::to_string);
    let complete_list_size = token_element
        .and_then(|t| t.attr("completeListSize"))
        .and_then(|s| s.trim().parse().ok());

    Ok(RecordPage {
        records,
        resumption_token,
        complete_list_size,
    })
}

fn record_from_element(record: &XmlElement) -> RawRecord {
    let header = record.child("header");
    let header = RecordHeader {
        identifier: header
            .and_then(|h| h.child("identifier"))
            .and_then(|i| i.text())
            .map(str::to_string),
        datestamp: header
            .and_then(|h| h.child("datestamp"))
            .and_then(|d| d.text())
            .map(str::to_string),
        set_specs: header
            .map(|h| {
                h.children
                    .iter()
                    .filter(|c| c.is("setSpec"))
                    .filter_map(|s| s.text())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default(),
        deleted: header.and_then(|h| h.attr("status")) == Some("deleted"),
    };

    let metadata = record
        .child("metadata")
        .and_then(|m| m.children.first())
        .cloned();

    RawRecord { header, metadata }
}
