//! Messaging
//!
//! Structured messages between agents with per-agent mailboxes.

use bevy_ecs::prelude::*;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::{Builder, Uuid};

use crate::components::agent::Role;
use crate::components::world::{AgentRoster, DayClock};
use crate::tasks::{TaskBoard, TaskStatus};
use crate::SimRng;
use org_events::MessageRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    ResourceRequest,
    Escalation,
    StatusReport,
    CollaborationRequest,
}

impl MessageKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageKind::ResourceRequest => "resource_request",
            MessageKind::Escalation => "escalation",
            MessageKind::StatusReport => "status_report",
            MessageKind::CollaborationRequest => "collaboration_request",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Critical => "critical",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: Uuid,
    pub day: u64,
    pub from: String,
    pub to: String,
    pub kind: MessageKind,
    pub priority: Priority,
    pub subject: String,
}

impl Message {
    pub fn record(&self) -> MessageRecord {
        MessageRecord {
            message_id: self.id,
            from: self.from.clone(),
            to: self.to.clone(),
            kind: self.kind.as_str().to_string(),
            priority: self.priority.as_str().to_string(),
            subject: self.subject.clone(),
        }
    }
}

/// Messages sent today, in send order, indexed by recipient
#[derive(Resource, Debug, Default)]
pub struct CommunicationLog {
    messages: Vec<Message>,
    mailboxes: BTreeMap<String, Vec<usize>>,
}

impl CommunicationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear_day(&mut self) {
        self.messages.clear();
        self.mailboxes.clear();
    }

    /// Routes a message. The id is a v4 UUID built from the seeded generator.
    #[allow(clippy::too_many_arguments)]
    pub fn send<R: Rng>(
        &mut self,
        rng: &mut R,
        day: u64,
        from: &str,
        to: &str,
        kind: MessageKind,
        priority: Priority,
        subject: impl Into<String>,
    ) -> Uuid {
        let id = Builder::from_random_bytes(rng.gen()).into_uuid();
        let index = self.messages.len();
        self.messages.push(Message {
            id,
            day,
            from: from.to_string(),
            to: to.to_string(),
            kind,
            priority,
            subject: subject.into(),
        });
        self.mailboxes.entry(to.to_string()).or_default().push(index);
        id
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn inbox<'a>(&'a self, agent_id: &str) -> impl Iterator<Item = &'a Message> + 'a {
        self.mailboxes
            .get(agent_id)
            .into_iter()
            .flat_map(move |indices| indices.iter().filter_map(move |i| self.messages.get(*i)))
    }

    pub fn records(&self) -> Vec<MessageRecord> {
        self.messages.iter().map(Message::record).collect()
    }
}

/// System: agents that completed work today report to the CEO
pub fn send_status_reports(
    clock: Res<DayClock>,
    roster: Res<AgentRoster>,
    board: Res<TaskBoard>,
    mut comms: ResMut<CommunicationLog>,
    mut rng: ResMut<SimRng>,
) {
    let Some(ceo) = roster.agent_for(Role::Ceo) else {
        return;
    };

    for (agent_id, _, _) in roster.iter().filter(|(id, _, _)| *id != ceo) {
        let completed = board
            .tasks()
            .iter()
            .filter(|t| t.assigned_agent.as_deref() == Some(agent_id) && t.status() == TaskStatus::Completed)
            .count();
        if completed > 0 {
            comms.send(
                &mut rng.0,
                clock.day,
                agent_id,
                ceo,
                MessageKind::StatusReport,
                Priority::Low,
                format!("{} task(s) completed", completed),
            );
        }
    }
}
