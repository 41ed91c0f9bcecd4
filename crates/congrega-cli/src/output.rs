//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use serde::Serialize;

use congrega_core::listing::Page;
use congrega_core::{
    DashboardSummary, Event, Member, Notice, NoticeLevel, PrayerRequest, Visitor,
};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn is_json(&self) -> bool {
        matches!(self.format, OutputFormat::Json)
    }

    /// Check if output is in quiet mode
    pub fn is_quiet(&self) -> bool {
        matches!(self.format, OutputFormat::Quiet)
    }

    /// Print a single member
    pub fn print_member(&self, member: &Member) {
        match self.format {
            OutputFormat::Human => {
                println!("ID:         {}", member.id);
                println!("Name:       {}", member.name);
                println!("Role:       {}", member.role);
                println!("Status:     {}", member.status);
                if !member.phone.is_empty() {
                    println!("Phone:      {}", member.phone);
                }
                if let Some(date) = member.birth_date {
                    println!("Birth date: {}", date.format("%d/%m/%Y"));
                }
            }
            OutputFormat::Json => print_json(member),
            OutputFormat::Quiet => println!("{}", member.id),
        }
    }

    /// Print one page of members
    pub fn print_members(&self, page: &Page<&Member>) {
        match self.format {
            OutputFormat::Human => {
                if page.items.is_empty() {
                    println!("No members found.");
                    return;
                }
                for member in &page.items {
                    println!(
                        "{} | {} | {} | {}",
                        short_id(member.id.as_str()),
                        truncate(&member.name, 30),
                        truncate(&member.role, 15),
                        member.status
                    );
                }
                print_page_footer(page, "member(s)");
            }
            OutputFormat::Json => print_json(&PageJson::from(page)),
            OutputFormat::Quiet => {
                for member in &page.items {
                    println!("{}", member.id);
                }
            }
        }
    }

    /// Print one page of visitors, most recent first
    pub fn print_visitors(&self, page: &Page<&Visitor>) {
        match self.format {
            OutputFormat::Human => {
                if page.items.is_empty() {
                    println!("No visitors found.");
                    return;
                }
                for visitor in &page.items {
                    println!(
                        "{} | {} | {} | {}",
                        short_id(visitor.id.as_str()),
                        visitor.first_visit_date.format("%d/%m/%Y"),
                        truncate(&visitor.name, 30),
                        truncate_line(&visitor.notes, 35)
                    );
                }
                print_page_footer(page, "visitor(s)");
            }
            OutputFormat::Json => print_json(&PageJson::from(page)),
            OutputFormat::Quiet => {
                for visitor in &page.items {
                    println!("{}", visitor.id);
                }
            }
        }
    }

    /// Print a single event
    pub fn print_event(&self, event: &Event) {
        match self.format {
            OutputFormat::Human => {
                println!("ID:          {}", event.id);
                println!("Name:        {}", event.name);
                println!(
                    "When:        {} {}",
                    event.date.format("%d/%m/%Y"),
                    event.time.format("%H:%M")
                );
                if !event.description.is_empty() {
                    println!("Description: {}", event.description);
                }
                if event.image_data_url.is_some() {
                    println!("Image:       yes");
                }
            }
            OutputFormat::Json => print_json(event),
            OutputFormat::Quiet => println!("{}", event.id),
        }
    }

    /// Print one page of events in start order
    pub fn print_events(&self, page: &Page<&Event>) {
        match self.format {
            OutputFormat::Human => {
                if page.items.is_empty() {
                    println!("No events found.");
                    return;
                }
                for event in &page.items {
                    println!(
                        "{} | {} {} | {}",
                        short_id(event.id.as_str()),
                        event.date.format("%d/%m/%Y"),
                        event.time.format("%H:%M"),
                        truncate(&event.name, 40)
                    );
                }
                print_page_footer(page, "event(s)");
            }
            OutputFormat::Json => print_json(&PageJson::from(page)),
            OutputFormat::Quiet => {
                for event in &page.items {
                    println!("{}", event.id);
                }
            }
        }
    }

    /// Print one page of the prayer board
    pub fn print_prayer_requests(&self, page: &Page<&PrayerRequest>) {
        match self.format {
            OutputFormat::Human => {
                if page.items.is_empty() {
                    println!("No prayer requests yet.");
                    return;
                }
                for request in &page.items {
                    println!("────────────────────────────────────────");
                    println!(
                        "ID: {}  {}  {}",
                        short_id(request.id.as_str()),
                        request.date.format("%d/%m/%Y"),
                        request.display_name().unwrap_or("Anônimo")
                    );
                    println!();
                    println!("{}", request.request);
                    println!();
                }
                print_page_footer(page, "request(s)");
            }
            OutputFormat::Json => {
                // Anonymous requests never expose the stored name
                let items: Vec<_> = page
                    .items
                    .iter()
                    .map(|r| {
                        serde_json::json!({
                            "id": r.id,
                            "name": r.display_name(),
                            "request": r.request,
                            "isAnonymous": r.is_anonymous,
                            "date": r.date,
                        })
                    })
                    .collect();
                print_json(&serde_json::json!({
                    "page": page.number,
                    "totalPages": page.total_pages,
                    "totalItems": page.total_items,
                    "items": items,
                }));
            }
            OutputFormat::Quiet => {
                for request in &page.items {
                    println!("{}", request.id);
                }
            }
        }
    }

    /// Print the weekly program
    pub fn print_program(&self, text: &str) {
        match self.format {
            OutputFormat::Human => {
                if text.trim().is_empty() {
                    println!("No program published yet.");
                } else {
                    println!("{}", text);
                }
            }
            OutputFormat::Json => print_json(&serde_json::json!({ "content": text })),
            OutputFormat::Quiet => println!("{}", text),
        }
    }

    pub fn print_dashboard(&self, summary: &DashboardSummary) {
        match self.format {
            OutputFormat::Human => {
                println!("Active members:  {}", summary.active_members);
                println!("Visitors:        {}", summary.visitors);
                println!("Prayer requests: {}", summary.prayer_requests);
                println!("Upcoming events: {}", summary.upcoming_events.len());
                for event in summary.upcoming_events.iter().take(5) {
                    println!(
                        "  {} {}  {}",
                        event.date.format("%d/%m"),
                        event.time.format("%H:%M"),
                        truncate(&event.name, 40)
                    );
                }
            }
            OutputFormat::Json => print_json(&serde_json::json!({
                "activeMembers": summary.active_members,
                "visitors": summary.visitors,
                "prayerRequests": summary.prayer_requests,
                "upcomingEvents": summary.upcoming_events,
            })),
            OutputFormat::Quiet => {}
        }
    }

    /// Print a notice produced by the controller
    ///
    /// Errors go to stderr in every format.
    pub fn notice(&self, notice: &Notice) {
        match notice.level {
            NoticeLevel::Error => eprintln!("✗ {}", notice.text),
            NoticeLevel::Info => self.message(&notice.text),
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Check if we should prompt for confirmation
    pub fn should_prompt(&self) -> bool {
        self.format == OutputFormat::Human
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PageJson<'a, T: Serialize> {
    page: usize,
    total_pages: usize,
    total_items: usize,
    items: &'a [&'a T],
}

impl<'a, T: Serialize> From<&'a Page<&'a T>> for PageJson<'a, T> {
    fn from(page: &'a Page<&'a T>) -> Self {
        Self {
            page: page.number,
            total_pages: page.total_pages,
            total_items: page.total_items,
            items: &page.items,
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to encode output: {}", e),
    }
}

fn print_page_footer<T>(page: &Page<T>, noun: &str) {
    if page.total_pages > 1 {
        println!(
            "\npage {}/{} · {} {}",
            page.number, page.total_pages, page.total_items, noun
        );
    } else {
        println!("\n{} {}", page.total_items, noun);
    }
}

/// First 8 characters of an id, enough to select it again
fn short_id(id: &str) -> &str {
    match id.char_indices().nth(8) {
        Some((end, _)) => &id[..end],
        None => id,
    }
}

/// Truncate a string to max length, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Truncate to first line and max length
fn truncate_line(s: &str, max_len: usize) -> String {
    let first_line = s.lines().next().unwrap_or("");
    truncate(first_line, max_len)
}
