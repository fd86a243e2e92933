//! Scripted in-memory render surface for tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::ScrollPosition;
use crate::surface::RenderSurface;

/// A complete eight-cell row with the given id.
pub(crate) fn row_html(id: &str) -> String {
    format!(
        r#"<tr id="{id}"><td>{id}</td><td><div class="row_width_copy"><span>Short {id}</span></div></td><td><div class="row_width_copy"><span>Full {id}</span></div></td><td>5</td><td><div class="row_width_copy"><span>10,50</span></div></td><td>GOST 8732</td><td>St3</td><td>1.5</td></tr>"#
    )
}

#[derive(Debug, Default)]
struct ScriptState {
    position: ScrollPosition,
    scrolls: Vec<ScrollPosition>,
    readiness_polls: u32,
    navigations: Vec<String>,
    fills: Vec<(String, String)>,
    clicks: Vec<String>,
    pruned: Vec<String>,
    snapshots: u32,
    closed: bool,
}

/// Serves canned rows per scroll position and records every command.
pub(crate) struct ScriptedSurface {
    extent: ScrollPosition,
    pages: HashMap<ScrollPosition, Vec<String>>,
    stray_rows: Vec<String>,
    region_present: bool,
    ready_after: u32,
    fail_snapshot_at: Option<u32>,
    state: Mutex<ScriptState>,
}

impl ScriptedSurface {
    pub fn new(extent: ScrollPosition) -> Self {
        Self {
            extent,
            pages: HashMap::new(),
            stray_rows: Vec::new(),
            region_present: true,
            ready_after: 0,
            fail_snapshot_at: None,
            state: Mutex::new(ScriptState::default()),
        }
    }

    /// Render full rows for `ids` when scrolled to `position`.
    pub fn with_rows(self, position: ScrollPosition, ids: &[&str]) -> Self {
        let rows = ids.iter().map(|id| row_html(id)).collect();
        self.with_row_html(position, rows)
    }

    pub fn with_row_html(mut self, position: ScrollPosition, rows: Vec<String>) -> Self {
        self.pages.entry(position).or_default().extend(rows);
        self
    }

    /// A row rendered outside the table region at every position.
    pub fn with_stray_row(mut self, id: &str) -> Self {
        self.stray_rows.push(row_html(id));
        self
    }

    pub fn without_region(mut self) -> Self {
        self.region_present = false;
        self
    }

    /// Element checks report absent for the first `polls` checks.
    pub fn ready_after(mut self, polls: u32) -> Self {
        self.ready_after = polls;
        self
    }

    /// The `n`th content snapshot (1-based) fails.
    pub fn failing_snapshot(mut self, n: u32) -> Self {
        self.fail_snapshot_at = Some(n);
        self
    }

    pub fn scrolls(&self) -> Vec<ScrollPosition> {
        self.state.lock().unwrap().scrolls.clone()
    }

    pub fn readiness_polls(&self) -> u32 {
        self.state.lock().unwrap().readiness_polls
    }

    pub fn navigations(&self) -> Vec<String> {
        self.state.lock().unwrap().navigations.clone()
    }

    pub fn fills(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().fills.clone()
    }

    pub fn clicks(&self) -> Vec<String> {
        self.state.lock().unwrap().clicks.clone()
    }

    pub fn pruned(&self) -> Vec<String> {
        self.state.lock().unwrap().pruned.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().unwrap().closed
    }

    fn trailing_number(script: &str) -> ScrollPosition {
        let reversed: String = script
            .chars()
            .rev()
            .skip_while(|c| !c.is_ascii_digit())
            .take_while(|c| c.is_ascii_digit())
            .collect();
        reversed.chars().rev().collect::<String>().parse().unwrap_or(0)
    }
}

#[async_trait]
impl RenderSurface for ScriptedSurface {
    async fn navigate(&self, url: &str, _timeout: Duration) -> Result<()> {
        self.state.lock().unwrap().navigations.push(url.to_string());
        Ok(())
    }

    async fn fill_field(&self, selector: &str, value: &str) -> Result<()> {
        self.state
            .lock()
            .unwrap()
            .fills
            .push((selector.to_string(), value.to_string()));
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<()> {
        self.state.lock().unwrap().clicks.push(selector.to_string());
        Ok(())
    }

    async fn evaluate_script(&self, script: &str) -> Result<Value> {
        let mut state = self.state.lock().unwrap();

        if script.contains("!== null") {
            state.readiness_polls += 1;
            let ready = self.region_present && state.readiness_polls > self.ready_after;
            return Ok(Value::Bool(ready));
        }
        if script.contains("scrollHeight") {
            return Ok(Value::from(self.extent));
        }
        if script.contains("scrollTop =") || script.starts_with("window.scrollTo") {
            let position = Self::trailing_number(script);
            state.position = position;
            state.scrolls.push(position);
            return Ok(Value::Null);
        }
        if script.contains("querySelectorAll") {
            state.pruned.push(script.to_string());
            return Ok(Value::from(1));
        }
        Ok(Value::Null)
    }

    async fn current_content(&self) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        state.snapshots += 1;
        if self.fail_snapshot_at == Some(state.snapshots) {
            return Err(AppError::surface("current_content", "connection refused"));
        }

        let rows = self
            .pages
            .get(&state.position)
            .map(|rows| rows.concat())
            .unwrap_or_default();
        Ok(format!(
            r#"<html><body><div class="main_content_container"><div class="table_container"><table><tbody>{}</tbody></table></div></div><table><tbody>{}</tbody></table></body></html>"#,
            rows,
            self.stray_rows.concat()
        ))
    }

    async fn close(&self) -> Result<()> {
        self.state.lock().unwrap().closed = true;
        Ok(())
    }
}
