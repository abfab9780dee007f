use anyhow::Result;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};
use filters::{ContextField, FilterSet, Scope};
use strum::IntoEnumIterator;
use tracer_core::EventSchema;

pub struct TermPrinted;

pub trait TermPrintable {
    fn term_print(&self) -> Result<TermPrinted>;
}

impl TermPrintable for FilterSet {
    fn term_print(&self) -> Result<TermPrinted> {
        let mut table = table();

        table.set_header(vec![
            Cell::new("FILTER").add_attribute(Attribute::Bold),
            Cell::new("SCOPE").add_attribute(Attribute::Bold),
            Cell::new("EVENTS").add_attribute(Attribute::Bold),
            Cell::new("EXPRESSION").add_attribute(Attribute::Bold),
        ]);

        for filter in self.filters() {
            let scope_color = match filter.scope() {
                Scope::Global => Color::White,
                Scope::Process => Color::Green,
                Scope::Container => Color::Blue,
                Scope::Host => Color::Magenta,
            };

            let (events, events_color) = match filter.events() {
                None => ("*".to_string(), Color::White),
                Some(events) if events.is_empty() => ("never".to_string(), Color::Red),
                Some(events) => (
                    events.iter().cloned().collect::<Vec<_>>().join(", "),
                    Color::White,
                ),
            };

            let expression = filter
                .expression()
                .map(ToString::to_string)
                .unwrap_or_else(|| "*".to_string());

            table.add_row(vec![
                Cell::new(filter.name())
                    .fg(Color::Cyan)
                    .add_attribute(Attribute::Bold),
                Cell::new(filter.scope()).fg(scope_color),
                Cell::new(events).fg(events_color),
                Cell::new(expression),
            ]);
        }

        println!("{table}");
        Ok(TermPrinted)
    }
}

impl TermPrintable for EventSchema {
    fn term_print(&self) -> Result<TermPrinted> {
        let mut table = table();

        table.set_header(vec![
            Cell::new("EVENT").add_attribute(Attribute::Bold),
            Cell::new("ID").add_attribute(Attribute::Bold),
            Cell::new("ARGUMENTS").add_attribute(Attribute::Bold),
        ]);

        for event in self.events() {
            let args = event
                .args
                .iter()
                .map(|arg| format!("{}: {}", arg.name, arg.field_type))
                .collect::<Vec<_>>()
                .join("\n");

            table.add_row(vec![
                Cell::new(&event.name)
                    .fg(Color::Cyan)
                    .add_attribute(Attribute::Bold),
                Cell::new(event.id),
                Cell::new(args),
            ]);
        }

        println!("{table}");
        Ok(TermPrinted)
    }
}

/// Table of every [ContextField].
pub struct ContextFields;

impl TermPrintable for ContextFields {
    fn term_print(&self) -> Result<TermPrinted> {
        let mut table = table();

        table.set_header(vec![
            Cell::new("CONTEXT FIELD").add_attribute(Attribute::Bold),
            Cell::new("TYPE").add_attribute(Attribute::Bold),
            Cell::new("CONTAINER ONLY").add_attribute(Attribute::Bold),
        ]);

        for field in ContextField::iter() {
            table.add_row(vec![
                Cell::new(field)
                    .fg(Color::Cyan)
                    .add_attribute(Attribute::Bold),
                Cell::new(field.field_type()),
                Cell::new(if field.is_container_only() { "yes" } else { "" }),
            ]);
        }

        println!("{table}");
        Ok(TermPrinted)
    }
}

fn table() -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table
}
