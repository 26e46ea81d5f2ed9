use cadence_core::calendar::{CalendarEntry, DayBucket};
use cadence_core::date::CalendarDate;
use cadence_core::models::{ConcreteRecord, IntervalUnit, RecurrenceTemplate, VirtualInstance};
use comfy_table::{Attribute, Cell, Color, Row, Table};

use crate::parser::format_amount;

fn short_id(id: &uuid::Uuid) -> String {
    id.to_string()[..8].to_string()
}

fn amount_cell(amount_cents: Option<i64>) -> Cell {
    match amount_cents {
        Some(cents) if cents < 0 => Cell::new(format_amount(cents)).fg(Color::Red),
        Some(cents) => Cell::new(format_amount(cents)).fg(Color::Green),
        None => Cell::new(""),
    }
}

fn cadence_label(template: &RecurrenceTemplate) -> String {
    let unit = match template.interval_unit {
        IntervalUnit::Day => "day",
        IntervalUnit::Week => "week",
        IntervalUnit::Month => "month",
    };
    let mut label = if template.interval_count == 1 {
        format!("every {}", unit)
    } else {
        format!("every {} {}s", template.interval_count, unit)
    };
    if let Some(day) = template.day_of_month {
        label.push_str(&format!(" on day {}", day));
    }
    label
}

pub fn display_templates(templates: &[RecurrenceTemplate]) {
    if templates.is_empty() {
        println!("No templates found.");
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Description", "Kind", "Cadence", "Anchor", "Amount", "Occurrences"]);

    for template in templates {
        let mut row = Row::new();
        row.add_cell(Cell::new(short_id(&template.id)));

        let mut description = Cell::new(&template.description);
        if !template.active {
            description = description.add_attribute(Attribute::CrossedOut).fg(Color::DarkGrey);
        }
        row.add_cell(description);
        row.add_cell(Cell::new(template.kind.to_string()));
        row.add_cell(Cell::new(cadence_label(template)));
        row.add_cell(Cell::new(
            template.anchor_date.map_or_else(|| "None".to_string(), |d| d.to_string()),
        ));
        row.add_cell(amount_cell(template.amount_cents));
        row.add_cell(Cell::new(match template.max_occurrences {
            Some(max) => format!("{}/{}", template.completed_occurrences, max),
            None => "∞".to_string(),
        }));
        table.add_row(row);
    }

    println!("{table}");
}

pub fn display_instances(instances: &[VirtualInstance]) {
    if instances.is_empty() {
        println!("No upcoming occurrences.");
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["Ref", "Due", "Description", "Amount"]);
    for instance in instances {
        table.add_row(vec![
            Cell::new(instance.instance_ref().to_string()).fg(Color::DarkGrey),
            Cell::new(instance.due_date.to_string()),
            Cell::new(&instance.description).add_attribute(Attribute::Italic),
            amount_cell(instance.amount_cents),
        ]);
    }
    println!("{table}");
}

pub fn display_records(records: &[ConcreteRecord]) {
    if records.is_empty() {
        println!("No records.");
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Date", "Description", "Amount", "Settled"]);
    for record in records {
        table.add_row(vec![
            Cell::new(short_id(&record.id)),
            Cell::new(record.date.to_string()),
            Cell::new(&record.description),
            amount_cell(record.amount_cents),
            settled_cell(record.settled),
        ]);
    }
    println!("{table}");
}

fn settled_cell(settled: bool) -> Cell {
    if settled {
        Cell::new("yes").fg(Color::Green)
    } else {
        Cell::new("no").fg(Color::Yellow)
    }
}

/// Days without entries are left out.
pub fn display_calendar(buckets: &[DayBucket]) {
    let today = CalendarDate::today();
    let mut table = Table::new();
    table.set_header(vec!["Date", "Ref", "Description", "Amount", "Status"]);

    let mut rows = 0;
    for bucket in buckets.iter().filter(|b| !b.is_empty()) {
        for (i, entry) in bucket.entries.iter().enumerate() {
            let mut date_cell = Cell::new(if i == 0 { bucket.date.to_string() } else { String::new() });
            if bucket.date == today {
                date_cell = date_cell.fg(Color::Yellow).add_attribute(Attribute::Bold);
            }

            let (reference, description, status) = match entry {
                CalendarEntry::Concrete(record) => (
                    Cell::new(short_id(&record.id)),
                    Cell::new(&record.description),
                    settled_cell(record.settled),
                ),
                CalendarEntry::Virtual(instance) => (
                    Cell::new(instance.instance_ref().to_string()).fg(Color::DarkGrey),
                    Cell::new(format!("↻ {}", instance.description)).add_attribute(Attribute::Italic),
                    Cell::new("projected").fg(Color::DarkGrey),
                ),
            };
            table.add_row(vec![date_cell, reference, description, amount_cell(entry.amount_cents()), status]);
            rows += 1;
        }
    }

    if rows == 0 {
        println!("Nothing scheduled.");
    } else {
        println!("{table}");
    }
}
