//! Dilution MCP Server Implementation
//!
//! The adapter between MCP clients and the dilution calculator: tool
//! parameters play the role of the input form, tool results the role of the
//! output display and chart canvas.

use std::sync::Arc;

use base64::Engine;
use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
};
use rmcp::{schemars, tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::config::ServiceConfig;
use crate::models::DilutionForm;
use crate::tools::chart::{PngChartRenderer, RenderedChart, StepRenderer};
use crate::tools::dilution::{self, CalculationOutcome, Markup};
use crate::tools::status::StatusTracker;

/// Dilution MCP Service
#[derive(Clone)]
pub struct DilutionService {
    status_tracker: Arc<Mutex<StatusTracker>>,
    config: Arc<ServiceConfig>,
    tool_router: ToolRouter<DilutionService>,
}

impl DilutionService {
    pub fn new(config: ServiceConfig) -> Self {
        Self {
            status_tracker: Arc::new(Mutex::new(StatusTracker::new(config.clone()))),
            config: Arc::new(config),
            tool_router: Self::tool_router(),
        }
    }
}

// ============================================================================
// Parameter Structs
// ============================================================================

/// A form field: clients may send a JSON number or the text a user typed
#[derive(Debug, Clone, Deserialize, schemars::JsonSchema)]
#[serde(untagged)]
pub enum FormValue {
    Number(f64),
    Text(String),
}

impl FormValue {
    fn into_text(self) -> String {
        match self {
            FormValue::Number(n) => n.to_string(),
            FormValue::Text(s) => s,
        }
    }
}

fn form_text(value: Option<FormValue>) -> String {
    value.map(FormValue::into_text).unwrap_or_default()
}

fn default_unit() -> String { "ng/µL".to_string() }

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CalculateDilutionParams {
    /// Concentration of the stock DNA
    #[serde(default)]
    pub initial_concentration: Option<FormValue>,
    /// Unit of the stock concentration: ng/µL, µg/mL or mg/mL (default ng/µL)
    #[serde(default = "default_unit")]
    pub initial_unit: String,
    /// Desired concentration, must be lower than the stock
    #[serde(default)]
    pub target_concentration: Option<FormValue>,
    /// Unit of the target concentration (default ng/µL)
    #[serde(default = "default_unit")]
    pub target_unit: String,
    /// Final volume of each mixture in µL
    #[serde(default)]
    pub final_volume: Option<FormValue>,
    /// Number of dilution steps: 1 or 2 (default 1)
    #[serde(default)]
    pub steps: Option<FormValue>,
    /// Description markup: markdown (default) or html
    pub markup: Option<String>,
}

impl CalculateDilutionParams {
    fn into_form(self) -> DilutionForm {
        DilutionForm {
            initial_concentration: form_text(self.initial_concentration),
            initial_unit: self.initial_unit,
            target_concentration: form_text(self.target_concentration),
            target_unit: self.target_unit,
            final_volume: form_text(self.final_volume),
            steps: self.steps.map(FormValue::into_text),
        }
    }
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ConvertConcentrationParams {
    /// Concentration value to convert
    pub value: f64,
    /// Unit of the value: ng/µL, µg/mL or mg/mL
    pub from_unit: String,
    /// Unit to convert to (default ng/µL)
    #[serde(default = "default_unit")]
    pub to_unit: String,
}

fn default_step_index() -> u8 { 1 }

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct RenderDilutionChartParams {
    /// Stock DNA volume in µL
    pub stock_volume: f64,
    /// Diluent volume in µL
    pub diluent_volume: f64,
    /// Step number shown on the chart (default 1)
    #[serde(default = "default_step_index")]
    pub step_index: u8,
}

// ============================================================================
// Response Helpers
// ============================================================================

#[derive(Debug, Serialize)]
struct RenderChartResponse {
    success: bool,
    chart: RenderedChart,
}

fn to_json<T: Serialize>(value: &T) -> Result<String, McpError> {
    serde_json::to_string_pretty(value).map_err(|e| McpError::internal_error(e.to_string(), None))
}

fn chart_content(chart: &RenderedChart) -> Content {
    let data = base64::engine::general_purpose::STANDARD.encode(&chart.png);
    Content::image(data, "image/png")
}

// ============================================================================
// Tool Implementations
// ============================================================================

#[tool_router]
impl DilutionService {
    // --- Status ---

    #[tool(description = "Get the current status of the dilution service including build info, configuration, and process information")]
    async fn dilution_status(&self) -> Result<CallToolResult, McpError> {
        let tracker = self.status_tracker.lock().await;
        let status = tracker.get_status();
        let json = to_json(&status)?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }

    #[tool(description = "Get instructions for planning DNA dilutions: inputs, units, formulas, worked examples and error messages. Call this when unsure how to use the dilution tools.")]
    fn dilution_instructions(&self) -> Result<CallToolResult, McpError> {
        use crate::tools::status::DILUTION_INSTRUCTIONS;
        Ok(CallToolResult::success(vec![Content::text(DILUTION_INSTRUCTIONS)]))
    }

    // --- Dilution ---

    #[tool(description = "Calculate stock DNA and diluent volumes for a one- or two-step dilution. Returns a description, the plan as JSON, and one PNG bar chart per step. Invalid input returns success=false with a user-facing message.")]
    async fn calculate_dilution(&self, Parameters(p): Parameters<CalculateDilutionParams>) -> Result<CallToolResult, McpError> {
        let markup = match p.markup.as_deref() {
            Some(s) => Markup::from_str(s).unwrap_or_else(|| {
                tracing::warn!("Unknown markup '{}', using markdown", s);
                Markup::default()
            }),
            None => Markup::default(),
        };
        let form = p.into_form();

        let outcome = dilution::calculate_and_render(&form, markup, &self.config)
            .await
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;

        match outcome {
            CalculationOutcome::Computed(response) => {
                let mut contents = vec![
                    Content::text(response.description.clone()),
                    Content::text(to_json(&response)?),
                ];
                contents.extend(response.charts.iter().map(chart_content));
                Ok(CallToolResult::success(contents))
            }
            CalculationOutcome::Rejected(response) => {
                Ok(CallToolResult::success(vec![Content::text(to_json(&response)?)]))
            }
        }
    }

    #[tool(description = "Convert a DNA concentration between ng/µL, µg/mL and mg/mL. Unrecognized units are treated as ng/µL.")]
    fn convert_concentration(&self, Parameters(p): Parameters<ConvertConcentrationParams>) -> Result<CallToolResult, McpError> {
        let result = dilution::convert_concentration_tool(p.value, &p.from_unit, &p.to_unit);
        let json = to_json(&result)?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }

    #[tool(description = "Render a single stock-vs-diluent bar chart (PNG) from known volumes")]
    fn render_dilution_chart(&self, Parameters(p): Parameters<RenderDilutionChartParams>) -> Result<CallToolResult, McpError> {
        let mut renderer = PngChartRenderer::new(self.config.chart_width, self.config.chart_height);
        if let Some(dir) = &self.config.chart_dir {
            renderer = renderer.with_output_dir(dir);
        }
        renderer
            .render(p.stock_volume, p.diluent_volume, p.step_index)
            .map_err(|e| McpError::invalid_params(e.to_string(), None))?;

        let chart = renderer
            .into_charts()
            .pop()
            .ok_or_else(|| McpError::internal_error("Renderer produced no chart", None))?;
        let image = chart_content(&chart);
        let json = to_json(&RenderChartResponse { success: true, chart })?;
        Ok(CallToolResult::success(vec![Content::text(json), image]))
    }
}

// ============================================================================
// Server Handler
// ============================================================================

#[tool_handler]
impl ServerHandler for DilutionService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "dna-dilution".into(),
                version: crate::tools::status::VERSION.into(),
                title: Some("DNA Dilution Calculator".into()),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "DNA Dilution Calculator - plans one- and two-step dilutions of a DNA sample. \
                 IMPORTANT: Call dilution_instructions before the first calculation. \
                 Dilution: calculate_dilution (volumes + description + charts). \
                 Units: convert_concentration (ng/µL, µg/mL, mg/mL). \
                 Charts: render_dilution_chart. \
                 Service: dilution_status."
                    .into(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(json: serde_json::Value) -> CalculateDilutionParams {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_params_accept_numbers_and_text() {
        let form = params(serde_json::json!({
            "initial_concentration": 100,
            "target_concentration": "10",
            "final_volume": 50.5,
            "steps": "2"
        }))
        .into_form();

        assert_eq!(form.initial_concentration, "100");
        assert_eq!(form.target_concentration, "10");
        assert_eq!(form.final_volume, "50.5");
        assert_eq!(form.steps.as_deref(), Some("2"));
        assert_eq!(form.initial_unit, "ng/µL");
        assert_eq!(form.target_unit, "ng/µL");
    }

    #[test]
    fn test_missing_fields_become_empty_text() {
        let form = params(serde_json::json!({ "initial_concentration": 100 })).into_form();
        assert_eq!(form.target_concentration, "");
        assert_eq!(form.final_volume, "");
        assert_eq!(form.steps, None);

        let err = crate::tools::dilution::calculate_dilution(&form).unwrap_err();
        assert_eq!(err.kind(), "invalid_input");
    }

    #[test]
    fn test_server_info() {
        let service = DilutionService::new(ServiceConfig::default());
        let info = service.get_info();
        assert_eq!(info.server_info.name, "dna-dilution");
        assert!(info.instructions.unwrap().contains("calculate_dilution"));
    }
}
