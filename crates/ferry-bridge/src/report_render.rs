//! Markdown rendering for command replies: ticket tables, creation
//! pretexts, listing links and the help page.

use ferry_core::{format_bridge_date, shorten_text, task_word, task_word_title};
use ferry_redmine::Ticket;

use crate::ticket_pipeline::CreatedTicket;

const TABLE_HEADER: &str =
    "| ID | Project | Tracker | Status | Subject | Updated | Start date | End date | Priority | Author | Assignee |";
const TABLE_DIVIDER: &str = "|-|-|-|-|-|-|-|-|-|-|-|";
const SUBJECT_CELL_WIDTH: usize = 50;

// Canned issue-list filters: open tickets of active projects, authored by or
// assigned to the viewing user.
const AUTHORED_FILTER_QUERY: &str = "/issues?c%5B%5D=project&c%5B%5D=tracker&c%5B%5D=status&c%5B%5D=subject&f%5B%5D=status_id&f%5B%5D=author_id&f%5B%5D=project.status&op%5Bauthor_id%5D=%3D&op%5Bproject.status%5D=%3D&op%5Bstatus_id%5D=o&set_filter=1&sort=updated_on%3Adesc&v%5Bauthor_id%5D%5B%5D=me&v%5Bproject.status%5D%5B%5D=1&v%5Bstatus_id%5D%5B%5D=";
const ASSIGNED_FILTER_QUERY: &str = "/issues?c%5B%5D=project&c%5B%5D=tracker&c%5B%5D=status&c%5B%5D=subject&c%5B%5D=author&f%5B%5D=status_id&f%5B%5D=assigned_to_id&f%5B%5D=project.status&op%5Bassigned_to_id%5D=%3D&op%5Bproject.status%5D=%3D&op%5Bstatus_id%5D=o&set_filter=1&sort=author%2Cpriority%3Adesc%2Cupdated_on%3Adesc&v%5Bassigned_to_id%5D%5B%5D=me&v%5Bproject.status%5D%5B%5D=1&v%5Bstatus_id%5D%5B%5D=";

/// Renders tickets as a markdown table, one row per ticket in the order
/// given. Absent dates and assignees render as literal `None`.
pub fn render_ticket_table(base_url: &str, tickets: &[Ticket]) -> String {
    let base = base_url.trim_end_matches('/');
    let mut table = vec![TABLE_HEADER.to_string(), TABLE_DIVIDER.to_string()];
    for ticket in tickets {
        let subject = shorten_text(&ticket.subject, SUBJECT_CELL_WIDTH);
        let updated = format_bridge_date(ticket.updated_on.date_naive());
        let start = ticket
            .start_date
            .map(format_bridge_date)
            .unwrap_or_else(|| "None".to_string());
        let end = ticket
            .due_date
            .map(format_bridge_date)
            .unwrap_or_else(|| "None".to_string());
        let assignee = match &ticket.assigned_to {
            Some(assigned) => format!("[{}]({base}/users/{})", assigned.name, assigned.id),
            None => "None".to_string(),
        };
        table.push(format!(
            "| [{id}]({base}/issues/{id}) | [{project}]({base}/projects/{project_id}) | {tracker} | {status} | [{subject}]({base}/issues/{id}) | {updated} | {start} | {end} | {priority} | [{author}]({base}/users/{author_id}) | {assignee} |",
            id = ticket.id,
            project = ticket.project.name,
            project_id = ticket.project.id,
            tracker = ticket.tracker.name,
            status = ticket.status.name,
            priority = ticket.priority.name,
            author = ticket.author.name,
            author_id = ticket.author.id,
        ));
    }
    table.join("\n")
}

/// Channel-facing one-liner naming the creator and the distinct assignees,
/// first mention first. Ends with a newline so a table can follow.
pub fn render_creation_pretext(creator_username: &str, assignee_usernames: &[String]) -> String {
    let mut distinct: Vec<&str> = Vec::new();
    for name in assignee_usernames {
        if !distinct.contains(&name.as_str()) {
            distinct.push(name);
        }
    }
    let targets = distinct
        .iter()
        .map(|name| format!("*@{name}*"))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "**@{creator_username}** created {} for {targets}\n",
        task_word(assignee_usernames.len())
    )
}

/// Announcement for a freshly created ticket set: the header goes into the
/// channel message body, the pretext and table into its attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreationReport {
    pub header: String,
    pub pretext: String,
    pub table: String,
}

/// Announcement for a single ticket created through the form.
pub fn render_form_created(
    author: &str,
    creator_username: &str,
    assignee_username: &str,
    ticket: &Ticket,
    base_url: &str,
) -> CreationReport {
    CreationReport {
        header: format!("# Ok, {author}. I create task in redmine by form"),
        pretext: render_creation_pretext(creator_username, &[assignee_username.to_string()]),
        table: render_ticket_table(base_url, std::slice::from_ref(ticket)),
    }
}

/// Announcement for a batch of created tickets, table rows in input order.
pub fn render_batch_created(
    author: &str,
    creator_username: &str,
    created: &[CreatedTicket],
    base_url: &str,
) -> CreationReport {
    let assignees: Vec<String> = created
        .iter()
        .map(|entry| entry.assignee_chat_username.clone())
        .collect();
    let tickets: Vec<Ticket> = created.iter().map(|entry| entry.ticket.clone()).collect();
    CreationReport {
        header: format!(
            "# Ok, {author}. I create your {} in redmine.",
            task_word(created.len())
        ),
        pretext: render_creation_pretext(creator_username, &assignees),
        table: render_ticket_table(base_url, &tickets),
    }
}

/// Listing of tickets the viewer authored, with the browser filter link
/// after the table.
pub fn render_tickets_by_me(author: &str, tickets: &[Ticket], base_url: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let table = render_ticket_table(base_url, tickets);
    format!(
        "# Ok, {author}. I show {} assigned by you for others.\n{table}\n[{} assigned by me]({base}{AUTHORED_FILTER_QUERY})",
        task_word(tickets.len()),
        task_word_title(tickets.len()),
    )
}

/// Listing of tickets assigned to the viewer, with the browser filter link
/// before the table.
pub fn render_tickets_for_me(author: &str, tickets: &[Ticket], base_url: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let table = render_ticket_table(base_url, tickets);
    format!(
        "# Ok, {author}. I show {} assigned for you.\n[{} assigned to me]({base}{ASSIGNED_FILTER_QUERY})\n\n{table}",
        task_word(tickets.len()),
        task_word_title(tickets.len()),
    )
}

pub fn no_tickets_by_you(author: &str) -> String {
    format!("{author}, there are no tasks by you yet.")
}

pub fn no_tickets_for_you(author: &str) -> String {
    format!("{author}, there are no tasks for you yet.")
}

/// Help page listing every slash command the bridge answers.
pub fn render_help(author: &str) -> String {
    format!(
        "# Hi, {author}. I connect redmine tasks with mattermost.\n\
         \n\
         `/redmine help` - show help info about all commands app\n\
         `/redmine new_task` - create new one task by redmine form\n\
         `/redmine new_tasks` - create tasks in one slash-command\n\
         `/redmine tasks_by_me` - show tasks assigned by you for others\n\
         `/redmine tasks_for_me` - show tasks assigned for you\n\
         \n\
         You can create some tasks in one slash-command with some lines:\n\
         1. Купить колбасы @vasiliy.fedorov 09.05.2023\n\
         2. Написать симфонию @artem.ismagilov 10.05.2023\n\
         [number issue]. [some text] @[username] [day.month.year]\n\
         \n\
         I also turn `#t<id>` references in channel messages into task links."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ticket_fixture;

    #[test]
    fn unit_table_renders_links_and_literal_none_cells() {
        let mut ticket = ticket_fixture(42, "Купить колбасы");
        ticket.start_date = None;
        ticket.due_date = chrono::NaiveDate::from_ymd_opt(2023, 5, 9);
        ticket.assigned_to = None;
        let table = render_ticket_table("https://rm.example/", &[ticket]);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], TABLE_HEADER);
        assert_eq!(lines[1], TABLE_DIVIDER);
        assert!(lines[2].starts_with("| [42](https://rm.example/issues/42) |"));
        assert!(lines[2].contains("| None | 09.05.2023 |"));
        assert!(lines[2].ends_with("| None |"));
    }

    #[test]
    fn unit_table_links_assignee_when_present() {
        let ticket = ticket_fixture(7, "Написать симфонию");
        let table = render_ticket_table("https://rm.example", &[ticket]);
        assert!(table.contains("[Artem Ismagilov](https://rm.example/users/7)"));
    }

    #[test]
    fn unit_table_shortens_long_subjects() {
        let long_subject = "Очень длинное название задачи которое не помещается в одну ячейку таблицы";
        let ticket = ticket_fixture(1, long_subject);
        let table = render_ticket_table("https://rm.example", &[ticket]);
        assert!(table.contains("[...]"));
        assert!(!table.contains(long_subject));
    }

    #[test]
    fn unit_pretext_dedupes_assignees_in_first_seen_order() {
        let pretext = render_creation_pretext(
            "artem.ismagilov",
            &[
                "vasiliy.fedorov".to_string(),
                "petya".to_string(),
                "vasiliy.fedorov".to_string(),
            ],
        );
        assert_eq!(
            pretext,
            "**@artem.ismagilov** created tasks for *@vasiliy.fedorov*, *@petya*\n"
        );
    }

    #[test]
    fn unit_pretext_uses_singular_for_one_ticket() {
        let pretext =
            render_creation_pretext("artem.ismagilov", &["vasiliy.fedorov".to_string()]);
        assert_eq!(
            pretext,
            "**@artem.ismagilov** created task for *@vasiliy.fedorov*\n"
        );
    }

    #[test]
    fn unit_form_creation_report_splits_header_pretext_table() {
        let report = render_form_created(
            "Artem Ismagilov",
            "artem.ismagilov",
            "vasiliy.fedorov",
            &ticket_fixture(42, "Купить колбасы"),
            "https://rm.example",
        );
        assert_eq!(
            report.header,
            "# Ok, Artem Ismagilov. I create task in redmine by form"
        );
        assert_eq!(
            report.pretext,
            "**@artem.ismagilov** created task for *@vasiliy.fedorov*\n"
        );
        assert!(report.table.starts_with(TABLE_HEADER));
        assert!(report.table.contains("issues/42"));
    }

    #[test]
    fn unit_batch_creation_report_keeps_ticket_order() {
        let created = vec![
            CreatedTicket {
                ticket: ticket_fixture(100, "Первая"),
                assignee_chat_username: "vasiliy.fedorov".to_string(),
            },
            CreatedTicket {
                ticket: ticket_fixture(101, "Вторая"),
                assignee_chat_username: "petya".to_string(),
            },
        ];
        let report = render_batch_created(
            "Artem Ismagilov",
            "artem.ismagilov",
            &created,
            "https://rm.example",
        );
        assert_eq!(
            report.header,
            "# Ok, Artem Ismagilov. I create your tasks in redmine."
        );
        let first = report.table.find("Первая").expect("first subject");
        let second = report.table.find("Вторая").expect("second subject");
        assert!(first < second);
    }

    #[test]
    fn unit_listing_by_me_puts_filter_link_after_table() {
        let ticket = ticket_fixture(42, "Купить колбасы");
        let text = render_tickets_by_me("Artem Ismagilov", &[ticket], "https://rm.example");
        assert!(text.starts_with(
            "# Ok, Artem Ismagilov. I show task assigned by you for others.\n| ID |"
        ));
        assert!(text.ends_with("%5Bstatus_id%5D%5B%5D=)"));
        assert!(text.contains("[Task assigned by me](https://rm.example/issues?c%5B%5D=project"));
        assert!(text.contains("v%5Bauthor_id%5D%5B%5D=me"));
    }

    #[test]
    fn unit_listing_for_me_puts_filter_link_before_table() {
        let tickets = vec![
            ticket_fixture(1, "Первая"),
            ticket_fixture(2, "Вторая"),
        ];
        let text = render_tickets_for_me("Artem Ismagilov", &tickets, "https://rm.example");
        assert!(text.starts_with("# Ok, Artem Ismagilov. I show tasks assigned for you.\n[Tasks assigned to me](https://rm.example/issues?"));
        assert!(text.contains("v%5Bassigned_to_id%5D%5B%5D=me"));
        let link_offset = text.find("[Tasks assigned to me]").expect("link present");
        let table_offset = text.find("| ID |").expect("table present");
        assert!(link_offset < table_offset);
    }

    #[test]
    fn unit_help_names_every_command() {
        let help = render_help("Artem Ismagilov");
        assert!(help.starts_with("# Hi, Artem Ismagilov."));
        for command in [
            "/redmine help",
            "/redmine new_task",
            "/redmine new_tasks",
            "/redmine tasks_by_me",
            "/redmine tasks_for_me",
        ] {
            assert!(help.contains(command), "help must mention {command}");
        }
        assert!(help.contains("@[username] [day.month.year]"));
    }
}
