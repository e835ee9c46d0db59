//! Plain-text and JSON rendering of search results.

use colored::Colorize;
use serde_json::Value;

use crate::model::types::{
    EntityKind, OrganizationResult, Record, SearchResult, TicketResult, UserResult,
};
use crate::schema::SchemaRegistry;

/// Width of the attribute-name column.
const NAME_WIDTH: usize = 30;

#[derive(Debug, Clone, Copy)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    pub fn plain() -> Self {
        Self::new(false)
    }

    pub fn render_all(&self, results: &[SearchResult]) -> String {
        results.iter().map(|r| self.render(r)).collect()
    }

    pub fn render(&self, result: &SearchResult) -> String {
        match result {
            SearchResult::User(user) => self.render_user(user),
            SearchResult::Organization(org) => self.render_organization(org),
            SearchResult::Ticket(ticket) => self.render_ticket(ticket),
        }
    }

    fn render_user(&self, user: &UserResult) -> String {
        let mut out = self.record_block(EntityKind::User, &user.record);
        out.push_str(&self.section("Submitted Tickets"));
        out.push_str(&ticket_list(&user.submitted_tickets));
        out.push_str(&self.section("Assigned Tickets"));
        out.push_str(&ticket_list(&user.assigned_tickets));
        out.push_str(&self.section("Organization"));
        out.push_str(&organization_summary(user.organization.as_ref()));
        out
    }

    fn render_organization(&self, org: &OrganizationResult) -> String {
        let mut out = self.record_block(EntityKind::Organization, &org.record);
        out.push_str(&self.section("Users"));
        out.push_str(&user_list(&org.users));
        out.push_str(&self.section("Tickets"));
        out.push_str(&ticket_list(&org.tickets));
        out
    }

    fn render_ticket(&self, ticket: &TicketResult) -> String {
        let mut out = self.record_block(EntityKind::Ticket, &ticket.record);
        out.push_str(&self.section("Submitter"));
        out.push_str(&user_summary(ticket.submitter.as_ref()));
        out.push_str(&self.section("Assignee"));
        out.push_str(&user_summary(ticket.assignee.as_ref()));
        out.push_str(&self.section("Organization"));
        out.push_str(&organization_summary(ticket.organization.as_ref()));
        out
    }

    /// Header line followed by every schema attribute in schema order.
    fn record_block(&self, kind: EntityKind, record: &Record) -> String {
        let schema = SchemaRegistry::schema(kind);
        let key = &schema.primary_key().name;
        let header = format!("* {} with {} {}", kind.label(), key, display_value(record.value(key)));

        let mut out = if self.color {
            header.bold().to_string()
        } else {
            header
        };
        out.push('\n');
        for name in schema.attribute_names() {
            out.push_str(&format!(
                "{name:<width$} {}\n",
                display_value(record.value(name)),
                width = NAME_WIDTH
            ));
        }
        out
    }

    fn section(&self, title: &str) -> String {
        let line = format!("--- {title}:");
        if self.color {
            format!("{}\n", line.cyan())
        } else {
            format!("{line}\n")
        }
    }
}

fn summary_line(number: Option<usize>, label: &str, value: &Value) -> String {
    let prefix = number.map(|n| format!("{n}.")).unwrap_or_default();
    format!("{prefix:>3}{:<10} {}\n", format!(" {label}:"), display_value(value))
}

fn ticket_list(tickets: &[Record]) -> String {
    let mut out = String::new();
    for (i, ticket) in tickets.iter().enumerate() {
        out.push_str(&summary_line(Some(i + 1), "subject", ticket.value("subject")));
        out.push_str(&summary_line(None, "priority", ticket.value("priority")));
        out.push_str(&summary_line(None, "status", ticket.value("status")));
    }
    out
}

fn user_list(users: &[Record]) -> String {
    let mut out = String::new();
    for (i, user) in users.iter().enumerate() {
        out.push_str(&summary_line(Some(i + 1), "name", user.value("name")));
        out.push_str(&summary_line(None, "alias", user.value("alias")));
        out.push_str(&summary_line(None, "role", user.value("role")));
    }
    out
}

fn user_summary(user: Option<&Record>) -> String {
    let Some(user) = user else {
        return String::new();
    };
    let mut out = summary_line(None, "name", user.value("name"));
    out.push_str(&summary_line(None, "alias", user.value("alias")));
    out.push_str(&summary_line(None, "role", user.value("role")));
    out
}

fn organization_summary(org: Option<&Record>) -> String {
    org.map(|o| summary_line(None, "name", o.value("name")))
        .unwrap_or_default()
}

/// Human form of a raw value: strings unquoted, arrays comma-separated,
/// `null` as nothing.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(display_value)
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}

/// Pretty JSON array of results for robot output.
pub fn to_json(results: &[SearchResult]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(results)
}
