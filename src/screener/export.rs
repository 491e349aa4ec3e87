use super::config;
use super::processor::ProcessedStock;
use anyhow::{Context, Result};
use rust_xlsxwriter::{Format, FormatAlign, Workbook, Worksheet};

/// Column header and value accessor for one workbook column
struct ExportColumn {
    header: &'static str,
    width: f64,
    value: fn(&ProcessedStock) -> CellValue,
}

enum CellValue {
    Text(Option<String>),
    Number(Option<f64>),
}

const EXPORT_COLUMNS: &[ExportColumn] = &[
    ExportColumn { header: "ticker", width: 18.0, value: |s| CellValue::Text(Some(s.base.ticker.clone())) },
    ExportColumn { header: "name", width: 16.0, value: |s| CellValue::Text(s.base.name.clone()) },
    ExportColumn { header: "description", width: 32.0, value: |s| CellValue::Text(s.base.description.clone()) },
    ExportColumn { header: "sector", width: 24.0, value: |s| CellValue::Text(s.base.sector.clone()) },
    ExportColumn { header: "Market Cap (₹ Cr)", width: 18.0, value: |s| CellValue::Number(s.market_cap_cr) },
    ExportColumn { header: "Revenue (₹ Cr)", width: 16.0, value: |s| CellValue::Number(s.revenue_cr) },
    ExportColumn { header: "Debt (₹ Cr)", width: 14.0, value: |s| CellValue::Number(s.debt_cr) },
    ExportColumn { header: "net_income_ttm", width: 18.0, value: |s| CellValue::Number(s.base.net_income) },
    ExportColumn { header: "price_earnings_ttm", width: 14.0, value: |s| CellValue::Number(s.base.price_earnings) },
    ExportColumn { header: "return_on_equity", width: 14.0, value: |s| CellValue::Number(s.base.return_on_equity) },
    ExportColumn { header: "return_on_assets", width: 14.0, value: |s| CellValue::Number(s.base.return_on_assets) },
    ExportColumn { header: "ROCE (%)", width: 12.0, value: |s| CellValue::Number(s.roce) },
    ExportColumn { header: "debt_to_equity", width: 14.0, value: |s| CellValue::Number(s.base.debt_to_equity) },
    ExportColumn { header: "free_cash_flow_ttm", width: 18.0, value: |s| CellValue::Number(s.base.free_cash_flow) },
    ExportColumn { header: "book_value_per_share", width: 18.0, value: |s| CellValue::Number(s.base.book_value_per_share) },
    ExportColumn { header: "dividends_yield_current", width: 14.0, value: |s| CellValue::Number(s.base.dividend_yield) },
    ExportColumn { header: "close", width: 12.0, value: |s| CellValue::Number(s.base.close) },
    ExportColumn { header: "change", width: 10.0, value: |s| CellValue::Number(s.base.change) },
    ExportColumn { header: "volume", width: 14.0, value: |s| CellValue::Number(s.base.volume) },
    ExportColumn { header: "Fundamental Score", width: 16.0, value: |s| CellValue::Number(Some(s.fundamental_score)) },
];

/// Serialize the result table into an in-memory .xlsx workbook
pub fn write_workbook(stocks: &[ProcessedStock]) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet
        .set_name(config::EXPORT_SHEET_NAME)
        .context("Failed to name worksheet")?;

    write_sheet(worksheet, stocks)?;

    workbook
        .save_to_buffer()
        .context("Failed to serialize workbook")
}

fn write_sheet(worksheet: &mut Worksheet, stocks: &[ProcessedStock]) -> Result<()> {
    let header_format = Format::new().set_bold().set_align(FormatAlign::Center);
    let number_format = Format::new().set_num_format("#,##0.00");

    for (col_idx, column) in EXPORT_COLUMNS.iter().enumerate() {
        let col_idx = col_idx as u16;
        worksheet.write_string_with_format(0, col_idx, column.header, &header_format)?;
        worksheet.set_column_width(col_idx, column.width)?;
    }

    for (row_idx, stock) in stocks.iter().enumerate() {
        let row = row_idx as u32 + 1;
        for (col_idx, column) in EXPORT_COLUMNS.iter().enumerate() {
            let col_idx = col_idx as u16;
            match (column.value)(stock) {
                CellValue::Text(Some(text)) => {
                    worksheet.write_string(row, col_idx, &text)?;
                }
                CellValue::Number(Some(number)) => {
                    worksheet.write_number_with_format(row, col_idx, number, &number_format)?;
                }
                // blank cell for missing values
                CellValue::Text(None) | CellValue::Number(None) => {}
            }
        }
    }

    worksheet.set_freeze_panes(1, 0)?;
    let last_col = (EXPORT_COLUMNS.len() - 1) as u16;
    worksheet.autofilter(0, 0, stocks.len() as u32, last_col)?;

    Ok(())
}

pub fn export_headers() -> Vec<&'static str> {
    EXPORT_COLUMNS.iter().map(|c| c.header).collect()
}

/// What `save_workbook` put on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SavedWorkbook {
    pub rows: usize,
    pub bytes: usize,
}

/// Write the workbook to disk
pub fn save_workbook(stocks: &[ProcessedStock], path: &str) -> Result<SavedWorkbook> {
    let bytes = write_workbook(stocks)?;
    std::fs::write(path, &bytes).with_context(|| format!("Failed to write {}", path))?;
    Ok(SavedWorkbook {
        rows: stocks.len(),
        bytes: bytes.len(),
    })
}
