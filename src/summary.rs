// 📊 Store summary - paged list of stores with their balances

use crate::db::{count_stores, get_all_store_summaries, get_store_summaries};
use crate::entities::StoreSummary;
use anyhow::Result;
use rusqlite::Connection;
use serde::Serialize;
use std::io::Write;

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Page number and size after defaults and limits are applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub page_size: i64,
}

impl PageRequest {
    /// Non-positive page → 1, non-positive size → 10, size capped at 100
    pub fn normalize(page: Option<i64>, page_size: Option<i64>) -> Self {
        let page = match page {
            Some(p) if p > 0 => p,
            _ => 1,
        };

        let page_size = match page_size {
            Some(s) if s > MAX_PAGE_SIZE => MAX_PAGE_SIZE,
            Some(s) if s > 0 => s,
            _ => DEFAULT_PAGE_SIZE,
        };

        PageRequest { page, page_size }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.page_size)
    }

    pub fn total_pages(&self, total_items: i64) -> i64 {
        if total_items == 0 {
            0
        } else {
            (total_items + self.page_size - 1) / self.page_size
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSummaryPage {
    pub page: i64,
    pub page_size: i64,
    pub total_items: i64,
    pub total_pages: i64,
    pub items: Vec<StoreSummary>,
}

pub fn summarize_stores(conn: &Connection, request: PageRequest) -> Result<StoreSummaryPage> {
    let total_items = count_stores(conn)?;
    let items = get_store_summaries(conn, request.offset(), request.page_size)?;

    Ok(StoreSummaryPage {
        page: request.page,
        page_size: request.page_size,
        total_items,
        total_pages: request.total_pages(total_items),
        items,
    })
}

/// Write every store summary as CSV, returning the number of rows
pub fn export_store_summaries<W: Write>(conn: &Connection, writer: W) -> Result<usize> {
    let summaries = get_all_store_summaries(conn)?;

    let mut wtr = csv::Writer::from_writer(writer);
    for summary in &summaries {
        wtr.serialize(summary)?;
    }
    wtr.flush()?;

    Ok(summaries.len())
}
