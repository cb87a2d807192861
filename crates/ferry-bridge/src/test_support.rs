//! In-memory tracker and chat stand-ins shared by the bridge tests and
//! the cross-crate integration suite.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use ferry_access::{IdentityDirectory, IdentityTable, TrackerLogin};
use ferry_mattermost::{ChatError, ChatGateway, MessageAttachment, PostedMessage};
use ferry_redmine::{
    IssueDraft, NamedRef, Project, Ticket, TrackerError, TrackerGateway, TrackerSession,
    TrackerUser,
};

/// Identity table used across the bridge tests: three chat users mapped to
/// their tracker logins.
pub fn identity_directory_fixture() -> IdentityDirectory {
    IdentityDirectory::from_table(IdentityTable::from_entries([
        ("artem.ismagilov", "a.ismagilov"),
        ("vasiliy.fedorov", "v.fedorov"),
        ("petya", "p.petrov"),
    ]))
}

pub fn fixed_updated_on() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2023-05-09T10:51:23Z")
        .expect("valid timestamp")
        .with_timezone(&Utc)
}

/// A plausible fully-populated ticket for rendering tests.
pub fn ticket_fixture(id: u64, subject: &str) -> Ticket {
    Ticket {
        id,
        subject: subject.to_string(),
        project: NamedRef {
            id: 1,
            name: "Testing".to_string(),
        },
        tracker: NamedRef {
            id: 2,
            name: "Bug".to_string(),
        },
        status: NamedRef {
            id: 1,
            name: "New".to_string(),
        },
        priority: NamedRef {
            id: 4,
            name: "Normal".to_string(),
        },
        author: NamedRef {
            id: 5,
            name: "Vasiliy Fedorov".to_string(),
        },
        assigned_to: Some(NamedRef {
            id: 7,
            name: "Artem Ismagilov".to_string(),
        }),
        start_date: NaiveDate::from_ymd_opt(2023, 5, 1),
        due_date: NaiveDate::from_ymd_opt(2023, 5, 9),
        updated_on: fixed_updated_on(),
    }
}

#[derive(Clone, Copy)]
enum AccountScript {
    Active { id: u64 },
    CredentialRejected,
    Broken,
}

#[derive(Clone, Copy)]
enum ProjectScript {
    Missing,
    Forbidden,
}

enum IssueScript {
    Found(Ticket),
    Forbidden,
}

#[derive(Default)]
struct FakeTrackerState {
    accounts: HashMap<String, AccountScript>,
    projects: HashMap<String, ProjectScript>,
    issues: HashMap<u64, IssueScript>,
    authored: HashMap<String, Vec<Ticket>>,
    assigned: HashMap<String, Vec<Ticket>>,
    created: Vec<(String, IssueDraft)>,
    calls: Vec<String>,
    fail_creates: bool,
    next_issue_id: u64,
}

/// Scriptable in-memory tracker. Unknown logins behave as missing accounts,
/// known logins see every project unless scripted otherwise.
#[derive(Clone)]
pub struct FakeTracker {
    state: Arc<Mutex<FakeTrackerState>>,
}

impl FakeTracker {
    pub fn new() -> Self {
        let state = FakeTrackerState {
            next_issue_id: 100,
            ..FakeTrackerState::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn gateway(&self) -> Arc<dyn TrackerGateway> {
        Arc::new(FakeTrackerGateway {
            state: Arc::clone(&self.state),
        })
    }

    fn state(&self) -> std::sync::MutexGuard<'_, FakeTrackerState> {
        self.state.lock().expect("fake tracker lock")
    }

    pub fn register_account(&self, login: &str, id: u64) {
        self.state()
            .accounts
            .insert(login.to_string(), AccountScript::Active { id });
    }

    pub fn reject_credentials_for(&self, login: &str) {
        self.state()
            .accounts
            .insert(login.to_string(), AccountScript::CredentialRejected);
    }

    pub fn break_account(&self, login: &str) {
        self.state()
            .accounts
            .insert(login.to_string(), AccountScript::Broken);
    }

    pub fn hide_project_from(&self, login: &str) {
        self.state()
            .projects
            .insert(login.to_string(), ProjectScript::Missing);
    }

    pub fn forbid_project_for(&self, login: &str) {
        self.state()
            .projects
            .insert(login.to_string(), ProjectScript::Forbidden);
    }

    pub fn register_issue(&self, ticket: Ticket) {
        self.state()
            .issues
            .insert(ticket.id, IssueScript::Found(ticket));
    }

    pub fn forbid_issue(&self, id: u64) {
        self.state().issues.insert(id, IssueScript::Forbidden);
    }

    pub fn script_authored(&self, login: &str, tickets: Vec<Ticket>) {
        self.state().authored.insert(login.to_string(), tickets);
    }

    pub fn script_assigned(&self, login: &str, tickets: Vec<Ticket>) {
        self.state().assigned.insert(login.to_string(), tickets);
    }

    pub fn fail_creates(&self) {
        self.state().fail_creates = true;
    }

    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    pub fn created_drafts(&self) -> Vec<(String, IssueDraft)> {
        self.state().created.clone()
    }
}

struct FakeTrackerGateway {
    state: Arc<Mutex<FakeTrackerState>>,
}

impl TrackerGateway for FakeTrackerGateway {
    fn impersonate(&self, login: &TrackerLogin) -> Box<dyn TrackerSession> {
        Box::new(FakeTrackerSession {
            login: login.clone(),
            state: Arc::clone(&self.state),
        })
    }
}

struct FakeTrackerSession {
    login: TrackerLogin,
    state: Arc<Mutex<FakeTrackerState>>,
}

impl FakeTrackerSession {
    fn state(&self) -> std::sync::MutexGuard<'_, FakeTrackerState> {
        self.state.lock().expect("fake tracker lock")
    }
}

fn ticket_from_draft(id: u64, draft: &IssueDraft) -> Ticket {
    Ticket {
        id,
        subject: draft.subject.clone(),
        project: NamedRef {
            id: 1,
            name: "Testing".to_string(),
        },
        tracker: NamedRef {
            id: draft.tracker_id.unwrap_or(2),
            name: "Bug".to_string(),
        },
        status: NamedRef {
            id: draft.status_id.unwrap_or(1),
            name: "New".to_string(),
        },
        priority: NamedRef {
            id: draft.priority_id.unwrap_or(4),
            name: "Normal".to_string(),
        },
        author: NamedRef {
            id: 5,
            name: "Vasiliy Fedorov".to_string(),
        },
        assigned_to: draft.assigned_to_id.map(|assignee_id| NamedRef {
            id: assignee_id,
            name: format!("User {assignee_id}"),
        }),
        start_date: draft.start_date,
        due_date: draft.due_date,
        updated_on: fixed_updated_on(),
    }
}

#[async_trait]
impl TrackerSession for FakeTrackerSession {
    fn login(&self) -> &TrackerLogin {
        &self.login
    }

    async fn current_user(&self) -> Result<TrackerUser, TrackerError> {
        let mut state = self.state();
        state.calls.push(format!("account:{}", self.login));
        match state.accounts.get(self.login.as_str()) {
            Some(AccountScript::Active { id }) => Ok(TrackerUser {
                id: *id,
                login: self.login.as_str().to_string(),
                firstname: String::new(),
                lastname: String::new(),
            }),
            Some(AccountScript::CredentialRejected) => Err(TrackerError::CredentialRejected),
            Some(AccountScript::Broken) => Err(TrackerError::Api {
                operation: "current user",
                status: 500,
                body: "internal error".to_string(),
            }),
            None => Err(TrackerError::ImpersonationRejected {
                login: self.login.as_str().to_string(),
            }),
        }
    }

    async fn project(&self, ident: &str) -> Result<Project, TrackerError> {
        let mut state = self.state();
        state.calls.push(format!("project:{}:{ident}", self.login));
        match state.projects.get(self.login.as_str()) {
            Some(ProjectScript::Missing) => Err(TrackerError::NotFound {
                resource: "project",
                ident: ident.to_string(),
            }),
            Some(ProjectScript::Forbidden) => Err(TrackerError::Forbidden {
                resource: "project",
                ident: ident.to_string(),
            }),
            None => Ok(Project {
                id: 1,
                identifier: ident.to_string(),
                name: "Testing".to_string(),
            }),
        }
    }

    async fn create_issue(&self, draft: &IssueDraft) -> Result<Ticket, TrackerError> {
        let mut state = self.state();
        state.calls.push(format!("create:{}", self.login));
        if state.fail_creates {
            return Err(TrackerError::Api {
                operation: "issue create",
                status: 500,
                body: "internal error".to_string(),
            });
        }
        let id = state.next_issue_id;
        state.next_issue_id += 1;
        state
            .created
            .push((self.login.as_str().to_string(), draft.clone()));
        Ok(ticket_from_draft(id, draft))
    }

    async fn issue(&self, id: u64) -> Result<Ticket, TrackerError> {
        let mut state = self.state();
        state.calls.push(format!("issue:{}:{id}", self.login));
        match state.issues.get(&id) {
            Some(IssueScript::Found(ticket)) => Ok(ticket.clone()),
            Some(IssueScript::Forbidden) => Err(TrackerError::Forbidden {
                resource: "issue",
                ident: id.to_string(),
            }),
            None => Err(TrackerError::NotFound {
                resource: "issue",
                ident: id.to_string(),
            }),
        }
    }

    async fn issues_authored_by_me(&self) -> Result<Vec<Ticket>, TrackerError> {
        let mut state = self.state();
        state.calls.push(format!("authored:{}", self.login));
        Ok(state
            .authored
            .get(self.login.as_str())
            .cloned()
            .unwrap_or_default())
    }

    async fn issues_assigned_to_me(&self) -> Result<Vec<Ticket>, TrackerError> {
        let mut state = self.state();
        state.calls.push(format!("assigned:{}", self.login));
        Ok(state
            .assigned
            .get(self.login.as_str())
            .cloned()
            .unwrap_or_default())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedPost {
    pub channel_id: String,
    pub text: String,
    pub attachments: Vec<MessageAttachment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedEphemeral {
    pub user_id: String,
    pub channel_id: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedEdit {
    pub post_id: String,
    pub text: String,
}

#[derive(Default)]
struct FakeChatState {
    bot_user_id: String,
    posts: Vec<RecordedPost>,
    ephemerals: Vec<RecordedEphemeral>,
    edits: Vec<RecordedEdit>,
    fail_posts: bool,
    fail_ephemerals: bool,
    fail_edits: bool,
}

/// Recording chat gateway double.
#[derive(Clone)]
pub struct FakeChat {
    state: Arc<Mutex<FakeChatState>>,
}

impl FakeChat {
    pub fn new(bot_user_id: &str) -> Self {
        let state = FakeChatState {
            bot_user_id: bot_user_id.to_string(),
            ..FakeChatState::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn gateway(&self) -> Arc<dyn ChatGateway> {
        Arc::new(FakeChatGateway {
            state: Arc::clone(&self.state),
        })
    }

    fn state(&self) -> std::sync::MutexGuard<'_, FakeChatState> {
        self.state.lock().expect("fake chat lock")
    }

    pub fn fail_posts(&self) {
        self.state().fail_posts = true;
    }

    pub fn fail_ephemerals(&self) {
        self.state().fail_ephemerals = true;
    }

    pub fn fail_edits(&self) {
        self.state().fail_edits = true;
    }

    pub fn posts(&self) -> Vec<RecordedPost> {
        self.state().posts.clone()
    }

    pub fn ephemerals(&self) -> Vec<RecordedEphemeral> {
        self.state().ephemerals.clone()
    }

    pub fn edits(&self) -> Vec<RecordedEdit> {
        self.state().edits.clone()
    }
}

struct FakeChatGateway {
    state: Arc<Mutex<FakeChatState>>,
}

fn chat_refused(operation: &'static str) -> ChatError {
    ChatError::Api {
        operation,
        status: 500,
        body: "internal error".to_string(),
    }
}

#[async_trait]
impl ChatGateway for FakeChatGateway {
    async fn bot_user_id(&self) -> Result<String, ChatError> {
        Ok(self.state.lock().expect("fake chat lock").bot_user_id.clone())
    }

    async fn post_message(
        &self,
        channel_id: &str,
        text: &str,
        attachments: &[MessageAttachment],
    ) -> Result<PostedMessage, ChatError> {
        let mut state = self.state.lock().expect("fake chat lock");
        if state.fail_posts {
            return Err(chat_refused("create post"));
        }
        state.posts.push(RecordedPost {
            channel_id: channel_id.to_string(),
            text: text.to_string(),
            attachments: attachments.to_vec(),
        });
        Ok(PostedMessage {
            id: format!("post-{}", state.posts.len()),
            channel_id: channel_id.to_string(),
        })
    }

    async fn post_ephemeral(
        &self,
        user_id: &str,
        channel_id: &str,
        text: &str,
    ) -> Result<(), ChatError> {
        let mut state = self.state.lock().expect("fake chat lock");
        if state.fail_ephemerals {
            return Err(chat_refused("create ephemeral post"));
        }
        state.ephemerals.push(RecordedEphemeral {
            user_id: user_id.to_string(),
            channel_id: channel_id.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }

    async fn update_message(&self, post_id: &str, text: &str) -> Result<(), ChatError> {
        let mut state = self.state.lock().expect("fake chat lock");
        if state.fail_edits {
            return Err(chat_refused("patch post"));
        }
        state.edits.push(RecordedEdit {
            post_id: post_id.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }
}
