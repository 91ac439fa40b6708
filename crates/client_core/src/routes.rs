use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Landing,
    Rsvp,
    Gifts,
    Guestbook,
    Admin,
    Login,
    NotFound(String),
}

impl Route {
    /// Maps a location to a page. Query strings, fragments and a trailing
    /// slash are ignored.
    pub fn parse(location: &str) -> Self {
        let path = location
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .trim();
        let trimmed = path.trim_end_matches('/');
        match trimmed {
            "" => Self::Landing,
            "/rsvp" => Self::Rsvp,
            "/gifts" => Self::Gifts,
            "/guestbook" => Self::Guestbook,
            "/admin" => Self::Admin,
            "/login" => Self::Login,
            _ => Self::NotFound(path.to_string()),
        }
    }

    pub fn path(&self) -> &str {
        match self {
            Self::Landing => "/",
            Self::Rsvp => "/rsvp",
            Self::Gifts => "/gifts",
            Self::Guestbook => "/guestbook",
            Self::Admin => "/admin",
            Self::Login => "/login",
            Self::NotFound(path) => path,
        }
    }

    /// The wizard step a page belongs to, if any.
    pub fn workflow_step(&self) -> Option<WorkflowStep> {
        match self {
            Self::Rsvp => Some(WorkflowStep::Rsvp),
            Self::Gifts => Some(WorkflowStep::Gifts),
            Self::Guestbook => Some(WorkflowStep::Guestbook),
            _ => None,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum WorkflowStep {
    Rsvp,
    Gifts,
    Guestbook,
}

impl WorkflowStep {
    pub const ALL: [WorkflowStep; 3] = [Self::Rsvp, Self::Gifts, Self::Guestbook];

    pub fn label(self) -> &'static str {
        match self {
            Self::Rsvp => "RSVP",
            Self::Gifts => "Wish List",
            Self::Guestbook => "Guestbook",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Rsvp => "Confirm attendance",
            Self::Gifts => "Reserve a gift",
            Self::Guestbook => "Leave a message",
        }
    }

    pub fn route(self) -> Route {
        match self {
            Self::Rsvp => Route::Rsvp,
            Self::Gifts => Route::Gifts,
            Self::Guestbook => Route::Guestbook,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Completed,
    Current,
    Upcoming,
}

/// Display status of every step while `current` is shown. Purely positional:
/// earlier steps read as completed whether or not the guest did them.
pub fn workflow_status(current: WorkflowStep) -> [(WorkflowStep, StepStatus); 3] {
    WorkflowStep::ALL.map(|step| {
        let status = match step.cmp(&current) {
            std::cmp::Ordering::Less => StepStatus::Completed,
            std::cmp::Ordering::Equal => StepStatus::Current,
            std::cmp::Ordering::Greater => StepStatus::Upcoming,
        };
        (step, status)
    })
}

#[cfg(test)]
#[path = "tests/routes_tests.rs"]
mod tests;
