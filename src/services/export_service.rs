use chrono::{DateTime, FixedOffset, Utc};
use rust_xlsxwriter::*;

use crate::error::Result;
use crate::models::report::{DateRange, ReportRow};

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

pub struct ExportService;

impl ExportService {
    /// Renders session rows as a single-sheet workbook. Times are shown in
    /// `offset`, durations in hours with one decimal.
    pub fn generate_sessions_xlsx(
        rows: &[ReportRow],
        range: DateRange,
        offset: FixedOffset,
    ) -> Result<Vec<u8>> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name("Sessions")?;

        let header_bg = Color::RGB(0x0F172A);
        let border_color = Color::RGB(0xE2E8F0);
        let alt_row = Color::RGB(0xF8FAFC);

        let columns = [
            ("Дата", 12.0),
            ("Сотрудник", 28.0),
            ("Username", 18.0),
            ("Категория", 12.0),
            ("Приход", 10.0),
            ("Уход", 10.0),
            ("Часы", 8.0),
        ];
        for (i, (_, width)) in columns.iter().enumerate() {
            worksheet.set_column_width(i as u16, *width)?;
        }
        let last_col = (columns.len() - 1) as u16;

        let title_format = Format::new()
            .set_font_size(14)
            .set_bold()
            .set_align(FormatAlign::Center)
            .set_align(FormatAlign::VerticalCenter);
        let title = format!(
            "Отчёт по сменам {} - {}",
            range.start.format("%d.%m.%Y"),
            range.end.format("%d.%m.%Y")
        );
        worksheet.set_row_height(0, 28)?;
        worksheet.merge_range(0, 0, 0, last_col, &title, &title_format)?;

        let header_format = Format::new()
            .set_bold()
            .set_font_color(Color::White)
            .set_background_color(header_bg)
            .set_align(FormatAlign::Center)
            .set_border(FormatBorder::Thin)
            .set_border_color(border_color);
        let header_row = 1;
        for (i, (name, _)) in columns.iter().enumerate() {
            worksheet.write_string_with_format(header_row, i as u16, *name, &header_format)?;
        }

        let data_start_row = header_row + 1;
        let mut total_minutes = 0i64;
        for (idx, row) in rows.iter().enumerate() {
            let r = data_start_row + idx as u32;
            let mut base = Format::new()
                .set_border(FormatBorder::Thin)
                .set_border_color(border_color);
            if idx % 2 == 0 {
                base = base.set_background_color(alt_row);
            }
            let center = base.clone().set_align(FormatAlign::Center);
            let hours = base.clone().set_num_format("0.0");

            worksheet.write_string_with_format(
                r,
                0,
                row.date.format("%d.%m.%Y").to_string(),
                &center,
            )?;
            worksheet.write_string_with_format(r, 1, &row.name, &base)?;
            worksheet.write_string_with_format(
                r,
                2,
                row.username
                    .as_deref()
                    .map(|u| format!("@{}", u))
                    .unwrap_or_default(),
                &base,
            )?;
            worksheet.write_string_with_format(r, 3, row.category.label(), &center)?;
            worksheet.write_string_with_format(r, 4, clock(row.check_in, offset), &center)?;
            worksheet.write_string_with_format(
                r,
                5,
                row.check_out.map(|t| clock(t, offset)).unwrap_or_default(),
                &center,
            )?;
            worksheet.write_number_with_format(
                r,
                6,
                row.duration_minutes as f64 / 60.0,
                &hours,
            )?;
            total_minutes += row.duration_minutes;
        }

        let total_row = data_start_row + rows.len() as u32;
        let total_label = Format::new().set_bold().set_align(FormatAlign::Right);
        let total_value = Format::new().set_bold().set_num_format("0.0");
        worksheet.merge_range(total_row, 0, total_row, last_col - 1, "Итого", &total_label)?;
        worksheet.write_number_with_format(
            total_row,
            last_col,
            total_minutes as f64 / 60.0,
            &total_value,
        )?;

        worksheet.set_freeze_panes(data_start_row, 0)?;

        let buffer = workbook.save_to_buffer()?;
        Ok(buffer)
    }

    pub fn filename(range: DateRange) -> String {
        format!(
            "attendance_{}_{}.xlsx",
            range.start.format("%Y%m%d"),
            range.end.format("%Y%m%d")
        )
    }

    /// Name of an employee's own report.
    pub fn user_filename(user_id: i64, range: DateRange) -> String {
        format!(
            "attendance_{}_{}_{}.xlsx",
            user_id,
            range.start.format("%Y%m%d"),
            range.end.format("%Y%m%d")
        )
    }
}

fn clock(at: DateTime<Utc>, offset: FixedOffset) -> String {
    at.with_timezone(&offset).format("%H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::Category;
    use chrono::{NaiveDate, TimeZone};

    #[test]
    fn renders_a_zip_container() {
        let day = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let check_in = Utc.with_ymd_and_hms(2025, 3, 10, 6, 0, 0).unwrap();
        let rows = vec![ReportRow {
            date: day,
            user_id: 1,
            name: "Anna".into(),
            username: Some("anna".into()),
            category: Category::Kitchen,
            check_in,
            check_out: Some(check_in + chrono::Duration::minutes(510)),
            duration_minutes: 510,
        }];
        let offset = FixedOffset::east_opt(3 * 3600).unwrap();

        let bytes =
            ExportService::generate_sessions_xlsx(&rows, DateRange::single(day), offset).unwrap();
        assert!(bytes.starts_with(b"PK"));

        let empty = ExportService::generate_sessions_xlsx(&[], DateRange::single(day), offset);
        assert!(empty.is_ok());
    }

    #[test]
    fn clock_uses_workplace_offset() {
        let offset = FixedOffset::east_opt(3 * 3600).unwrap();
        let at = Utc.with_ymd_and_hms(2025, 3, 10, 6, 5, 0).unwrap();
        assert_eq!(clock(at, offset), "09:05");
        assert_eq!(
            ExportService::filename(DateRange::single(NaiveDate::from_ymd_opt(2025, 3, 1).unwrap())),
            "attendance_20250301_20250301.xlsx"
        );
        assert_eq!(
            ExportService::user_filename(
                42,
                DateRange::new(
                    NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
                    NaiveDate::from_ymd_opt(2025, 3, 7).unwrap()
                )
                .unwrap()
            ),
            "attendance_42_20250301_20250307.xlsx"
        );
    }
}
