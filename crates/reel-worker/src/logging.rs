//! Structured render logging utilities.

use tracing::{error, info, warn, Span};

use reel_models::RenderId;

/// Logs render lifecycle events with the render id and operation attached.
#[derive(Debug, Clone)]
pub struct RenderLogger {
    render_id: String,
    operation: String,
}

impl RenderLogger {
    /// # Arguments
    /// * `render_id` - Id naming the render's output file
    /// * `operation` - The type of render (e.g., "render", "render_dual")
    pub fn new(render_id: &RenderId, operation: &str) -> Self {
        Self {
            render_id: render_id.to_string(),
            operation: operation.to_string(),
        }
    }

    /// Log that the render began.
    pub fn log_start(&self, message: &str) {
        info!(
            render_id = %self.render_id,
            operation = %self.operation,
            "Render started: {}", message
        );
    }

    /// Log a progress percentage.
    pub fn log_progress(&self, percent: u8) {
        info!(
            render_id = %self.render_id,
            operation = %self.operation,
            percent,
            "Render progress: {}%", percent
        );
    }

    /// Log a non-fatal problem.
    pub fn log_warning(&self, message: &str) {
        warn!(
            render_id = %self.render_id,
            operation = %self.operation,
            "Render warning: {}", message
        );
    }

    /// Log the failure that ended the render.
    pub fn log_error(&self, message: &str) {
        error!(
            render_id = %self.render_id,
            operation = %self.operation,
            "Render error: {}", message
        );
    }

    /// Log a finished render.
    pub fn log_completion(&self, message: &str) {
        info!(
            render_id = %self.render_id,
            operation = %self.operation,
            "Render completed: {}", message
        );
    }

    /// Render this logger reports for.
    pub fn render_id(&self) -> &str {
        &self.render_id
    }

    /// Operation name, e.g. `render` or `render_dual`.
    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Span carrying the render id for everything logged beneath it.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "render",
            render_id = %self.render_id,
            operation = %self.operation
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_logger_creation() {
        let id = RenderId::new();
        let logger = RenderLogger::new(&id, "render");
        assert_eq!(logger.render_id(), id.as_str());
        assert_eq!(logger.operation(), "render");
    }
}
