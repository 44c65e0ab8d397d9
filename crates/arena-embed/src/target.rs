use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

const LOADING_PLACEHOLDER: &str = "<div class=\"arena--loading\"></div>";

/// Aggregate state of one `arena` block
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RenderStatus {
    #[default]
    Busy,
    Ready,
    Error,
}

impl RenderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderStatus::Busy => "busy",
            RenderStatus::Ready => "ready",
            RenderStatus::Error => "error",
        }
    }
}

impl fmt::Display for RenderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
struct TargetState {
    status: RenderStatus,
    children: Vec<String>,
    loading: bool,
    attached: bool,
}

/// Mount point for the embeds of one code block.
///
/// Line tasks share it by reference and only ever append. Once the host
/// calls [`RenderTarget::detach`], further writes are dropped.
#[derive(Debug)]
pub struct RenderTarget {
    state: Mutex<TargetState>,
}

impl Default for RenderTarget {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderTarget {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(TargetState {
                status: RenderStatus::Busy,
                children: Vec::new(),
                loading: false,
                attached: true,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, TargetState> {
        // appends can't leave the state half-written
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mark busy and show the loading placeholder until the first node arrives.
    pub fn begin(&self) {
        let mut state = self.lock();
        if !state.attached {
            return;
        }
        state.status = RenderStatus::Busy;
        state.loading = true;
    }

    /// Append one rendered node. Returns `false` if the target was detached.
    pub fn append(&self, html: String) -> bool {
        let mut state = self.lock();
        if !state.attached {
            tracing::debug!("dropping write to detached render target");
            return false;
        }
        state.loading = false;
        state.children.push(html);
        true
    }

    pub fn set_status(&self, status: RenderStatus) {
        let mut state = self.lock();
        if !state.attached {
            tracing::debug!(%status, "dropping status change on detached render target");
            return;
        }
        state.status = status;
        if status != RenderStatus::Busy {
            state.loading = false;
        }
    }

    pub fn status(&self) -> RenderStatus {
        self.lock().status
    }

    pub fn children(&self) -> Vec<String> {
        self.lock().children.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.lock().loading
    }

    /// Called by the host when the block leaves the view.
    pub fn detach(&self) {
        self.lock().attached = false;
    }

    pub fn is_attached(&self) -> bool {
        self.lock().attached
    }

    /// Container markup with the status attribute and all children
    pub fn to_html(&self) -> String {
        let state = self.lock();
        let mut html = String::new();
        html.push_str("<div class=\"arena--container\" data-status=\"");
        html.push_str(state.status.as_str());
        html.push_str("\">");
        if state.loading {
            html.push_str(LOADING_PLACEHOLDER);
        }
        for child in &state.children {
            html.push_str(child);
        }
        html.push_str("</div>");
        html
    }
}
