use client_core::{CollectionSpec, PageSlice};
use shared::{
    domain::Record,
    protocol::{Deal, Lead, StatusRow},
};

pub fn print_page(spec: &CollectionSpec, page: &PageSlice, page_count: usize) {
    for record in &page.records {
        match spec.table {
            "leads" => match record.decode::<Lead>() {
                Ok(lead) => print_lead(&lead),
                Err(_) => print_generic(spec, record),
            },
            "deals" => match record.decode::<Deal>() {
                Ok(deal) => print_deal(&deal),
                Err(_) => print_generic(spec, record),
            },
            _ => print_generic(spec, record),
        }
    }
    println!(
        "page {} of {} ({} matching)",
        page.page_index + 1,
        page_count.max(1),
        page.total
    );
}

pub fn print_lead(lead: &Lead) {
    println!(
        "{:<38} {:<24} {:<20} {:<28} {:<12} {:>10.2}",
        lead.id,
        lead.name,
        lead.company,
        lead.email,
        lead.status,
        lead.value
    );
}

pub fn print_deal(deal: &Deal) {
    println!(
        "{:<38} {:<38} {:<12} {:>12.2} {:>5.0}% {}",
        deal.id,
        deal.lead_id,
        deal.stage,
        deal.amount,
        deal.probability,
        deal.expected_close_date
    );
}

pub fn print_status(status: &StatusRow) {
    println!(
        "{:<38} {:<20} {}",
        status.id, status.status_name, status.status_color
    );
}

pub fn print_statuses(records: &[Record]) {
    for record in records {
        match record.decode::<StatusRow>() {
            Ok(status) => print_status(&status),
            Err(_) => println!("{}", record.id),
        }
    }
}

fn print_generic(spec: &CollectionSpec, record: &Record) {
    let columns: Vec<&str> = spec
        .searchable_fields
        .iter()
        .filter_map(|field| record.text(field))
        .collect();
    let status = spec
        .status_field
        .and_then(|field| record.text(field))
        .unwrap_or("-");
    println!("{:<38} {:<12} {}", record.id, status, columns.join(" | "));
}
