//! Spreadsheet rendering of attendance reports.

use rust_xlsxwriter::{Color, Format, FormatAlign, Workbook, XlsxError};

use crate::model::attendance::DailyAttendanceRecord;

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

const HEADER_FILL: u32 = 0x366092;

const COLUMNS: [(&str, f64); 8] = [
    ("First name", 20.0),
    ("Last name", 20.0),
    ("Document", 15.0),
    ("Date", 15.0),
    ("State", 15.0),
    ("Entry", 20.0),
    ("Exit", 20.0),
    ("Late minutes", 15.0),
];

fn clock(value: Option<chrono::NaiveDateTime>) -> String {
    value
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_default()
}

/// One worksheet, one row per user and day, in report order.
pub fn attendance_workbook(records: &[DailyAttendanceRecord]) -> Result<Vec<u8>, XlsxError> {
    let header = Format::new()
        .set_bold()
        .set_font_color(Color::White)
        .set_background_color(Color::RGB(HEADER_FILL))
        .set_align(FormatAlign::Center);

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name("Attendance")?;

    for (col, (title, width)) in (0u16..).zip(COLUMNS) {
        sheet.write_string_with_format(0, col, title, &header)?;
        sheet.set_column_width(col, width)?;
    }

    for (row, record) in (1u32..).zip(records) {
        sheet.write_string(row, 0, record.user.first_name.as_str())?;
        sheet.write_string(row, 1, record.user.last_name.as_str())?;
        sheet.write_string(row, 2, record.user.document_id.as_str())?;
        sheet.write_string(row, 3, record.date.format("%Y-%m-%d").to_string())?;
        sheet.write_string(row, 4, record.state.as_ref())?;
        sheet.write_string(row, 5, clock(record.entry_time))?;
        sheet.write_string(row, 6, clock(record.exit_time))?;
        sheet.write_number(row, 7, record.late_minutes.unwrap_or(0) as f64)?;
    }

    workbook.save_to_buffer()
}
