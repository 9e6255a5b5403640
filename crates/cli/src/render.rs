//! Cart rendering

use std::io;

use rust_decimal::Decimal;
use storefront_cart::{
    engine::{CartSnapshot, MergeReport},
    lines::CartLine,
    pricing::line_total,
    totals::{PricingError, Totals},
};
use tabled::{
    builder::Builder,
    settings::{
        Alignment, Color, Style,
        object::{Columns, Rows},
        themes::Theme,
    },
};
use thiserror::Error;

/// Errors raised while writing command output.
#[derive(Debug, Error)]
pub(crate) enum RenderError {
    /// An amount could not be shown in the cart currency.
    #[error(transparent)]
    Pricing(#[from] PricingError),

    /// Writing to the output failed.
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}

/// Write the cart lines as a table, followed by its totals.
pub(crate) fn write_cart(
    out: &mut impl io::Write,
    snapshot: &CartSnapshot,
) -> Result<(), RenderError> {
    writeln!(
        out,
        "Cart ({}, {} item{})",
        snapshot.mode(),
        snapshot.item_count(),
        if snapshot.item_count() == 1 { "" } else { "s" }
    )?;

    if snapshot.is_empty() {
        writeln!(out, "\nYour cart is empty.")?;
    } else {
        write_lines_table(out, snapshot.lines(), snapshot.totals())?;
    }

    write_summary(out, snapshot)?;

    if let Some(error) = snapshot.last_error() {
        writeln!(out, "\nLast error: {error}")?;
    }

    Ok(())
}

/// Write the outcome of merging an anonymous cart.
pub(crate) fn write_merge_report(
    out: &mut impl io::Write,
    report: &MergeReport,
) -> Result<(), RenderError> {
    writeln!(
        out,
        "Merged {} line(s) into your account cart.",
        report.merged().len()
    )?;

    for failure in report.failed() {
        writeln!(
            out,
            "  dropped variant {} x{}: {}",
            failure.variant, failure.quantity, failure.error
        )?;
    }

    if let Some(error) = report.fetch_error() {
        writeln!(out, "  could not load the account cart: {error}")?;
    }

    writeln!(out)?;

    Ok(())
}

fn write_lines_table(
    out: &mut impl io::Write,
    lines: &[CartLine],
    totals: &Totals,
) -> Result<(), RenderError> {
    let mut builder = Builder::default();

    builder.push_record(["Line", "Variant", "Item", "Qty", "Price", "Offer", "Total"]);

    for line in lines {
        let price = line.price();

        let offer = match price.active_discount_price() {
            Some(discount_price) => totals.money(discount_price)?.to_string(),
            None => "-".to_string(),
        };

        builder.push_record([
            line.id().to_string(),
            line.variant_id().to_string(),
            describe(line),
            line.quantity().to_string(),
            totals.money(price.list_price())?.to_string(),
            offer,
            totals.money(line_total(line))?.to_string(),
        ]);
    }

    let mut table = builder.build();

    table.with(Theme::from(Style::modern_rounded()));
    table.modify(Rows::first(), Color::BOLD);
    table.modify(Columns::new(3..7), Alignment::right());

    writeln!(out, "\n{table}")?;

    Ok(())
}

fn describe(line: &CartLine) -> String {
    let Some(product) = line.product() else {
        return String::new();
    };

    match (product.name.as_deref(), product.size.as_deref()) {
        (Some(name), Some(size)) => format!("{name} ({size})"),
        (Some(name), None) => name.to_string(),
        (None, Some(size)) => format!("({size})"),
        (None, None) => String::new(),
    }
}

fn write_summary(
    out: &mut impl io::Write,
    snapshot: &CartSnapshot,
) -> Result<(), RenderError> {
    let totals = snapshot.totals();

    let mut rows = vec![
        ("Subtotal".to_string(), totals.money(totals.subtotal())?.to_string()),
        (
            "Product savings".to_string(),
            totals.money(totals.product_discount())?.to_string(),
        ),
    ];

    if let Some(coupon) = snapshot.coupon() {
        rows.push((
            format!("Coupon ({})", coupon.code()),
            format!("-{}", totals.money(totals.coupon_discount())?),
        ));
    }

    rows.push(("Total".to_string(), totals.money(totals.final_total())?.to_string()));

    if totals.final_total() < Decimal::ZERO {
        rows.push((
            "Payable".to_string(),
            totals.money(totals.amount_payable())?.to_string(),
        ));
    }

    let label_width = rows
        .iter()
        .map(|(label, _)| label.chars().count())
        .max()
        .unwrap_or_default();
    let value_width = rows
        .iter()
        .map(|(_, value)| value.chars().count())
        .max()
        .unwrap_or_default();

    writeln!(out)?;

    for (label, value) in rows {
        writeln!(out, " {label:<label_width$}  {value:>value_width$}")?;
    }

    Ok(())
}
