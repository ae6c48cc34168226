//! Invoice PDF rendering.
//!
//! A single A4 page: parties, number and dates in the header, the amount
//! chain as a table below. Amounts are rounded to two decimals here and only
//! here; storage keeps full precision.

use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfLayerReference};

use crate::domain::Invoice;
use crate::error::{AppError, AppResult};

fn push_line(
    layer: &PdfLayerReference,
    font: &IndirectFontRef,
    text: &str,
    font_size: f32,
    x: f32,
    y: f32,
) {
    layer.use_text(text, font_size, Mm(x), Mm(y), font);
}

fn divider(layer: &PdfLayerReference, y: f32) {
    layer.add_line(printpdf::Line {
        points: vec![
            (printpdf::Point::new(Mm(15.0), Mm(y)), false),
            (printpdf::Point::new(Mm(195.0), Mm(y)), false),
        ],
        is_closed: false,
    });
}

fn money(value: f64) -> String {
    format!("{value:.2}")
}

/// Render an issued invoice to PDF bytes.
pub fn render_invoice_pdf(invoice: &Invoice) -> AppResult<Vec<u8>> {
    let (doc, page1, layer1) = PdfDocument::new(
        format!("Factura {}", invoice.number),
        Mm(210.0),
        Mm(297.0),
        "Layer 1",
    );
    let layer = doc.get_page(page1).get_layer(layer1);

    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| AppError::Internal(format!("PDF font failed: {e}")))?;
    let font_bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| AppError::Internal(format!("PDF font failed: {e}")))?;

    let mut y: f32 = 285.0;
    push_line(&layer, &font_bold, &invoice.owner_name, 16.0, 15.0, y);
    y -= 7.0;
    push_line(
        &layer,
        &font,
        &format!("Contract: {}", invoice.contract_name),
        10.0,
        15.0,
        y,
    );

    push_line(&layer, &font_bold, "FACTURA", 24.0, 145.0, 285.0);
    push_line(&layer, &font_bold, &invoice.number, 12.0, 145.0, 277.0);

    y = 265.0;
    divider(&layer, y);
    y -= 10.0;

    push_line(&layer, &font_bold, "Client", 11.0, 15.0, y);
    push_line(
        &layer,
        &font,
        &format!("Issued: {}", invoice.issued_at.format("%Y-%m-%d")),
        10.0,
        145.0,
        y,
    );
    y -= 6.0;
    push_line(&layer, &font, &invoice.partner_name, 10.0, 15.0, y);
    push_line(
        &layer,
        &font,
        &format!("Due: {}", invoice.due_date().format("%Y-%m-%d")),
        10.0,
        145.0,
        y,
    );

    y -= 14.0;
    divider(&layer, y);
    y -= 8.0;

    let vat_label = format!("VAT {:.0}% (RON)", invoice.tva_percent);
    let rows: [(&str, String); 7] = [
        ("Amount (EUR)", money(invoice.amount_eur)),
        (
            "Correction (%)",
            format!("{:.2}", invoice.correction_percent),
        ),
        ("Corrected amount (EUR)", money(invoice.corrected_amount_eur)),
        ("Exchange rate (RON/EUR)", format!("{:.4}", invoice.exchange_rate_ron)),
        ("Net (RON)", money(invoice.net_ron)),
        (vat_label.as_str(), money(invoice.vat_ron)),
        ("Total (RON)", money(invoice.total_ron)),
    ];
    for (index, (label, value)) in rows.iter().enumerate() {
        let is_total = index == rows.len() - 1;
        let label_font = if is_total { &font_bold } else { &font };
        push_line(&layer, label_font, label, 10.0, 15.0, y);
        push_line(&layer, label_font, value, 10.0, 160.0, y);
        y -= 6.0;
    }

    divider(&layer, y);
    push_line(
        &layer,
        &font,
        &format!("Payment due within {} days of issue.", invoice.due_days),
        9.0,
        15.0,
        12.0,
    );

    let mut writer = std::io::BufWriter::new(Vec::<u8>::new());
    doc.save(&mut writer)
        .map_err(|e| AppError::Internal(format!("PDF save failed: {e}")))?;
    writer
        .into_inner()
        .map_err(|e| AppError::Internal(format!("PDF buffer failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn renders_nonempty_pdf() {
        let invoice = Invoice {
            id: "IMO-2025-001".into(),
            number: "IMO-2025-001".into(),
            contract_id: "c1".into(),
            contract_name: "Unit 4".into(),
            owner_id: "o1".into(),
            owner_name: "Imob SRL".into(),
            partner_id: None,
            partner_name: "Acme SRL".into(),
            issued_at: "2025-05-01".parse().unwrap(),
            due_days: 30,
            amount_eur: 1000.0,
            correction_percent: 2.0,
            corrected_amount_eur: 1020.0,
            exchange_rate_ron: 4.9753,
            net_ron: 5074.806,
            tva_percent: 19.0,
            vat_ron: 964.21314,
            total_ron: 6039.01914,
            pdf_url: None,
            created_at: Utc::now(),
        };
        let bytes = render_invoice_pdf(&invoice).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        assert!(bytes.len() > 500);
    }
}
