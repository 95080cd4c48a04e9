//! Dilution MCP Tools
//!
//! Reads the dilution form, computes the plan and describes it for display.

use serde::Serialize;

use crate::concentration::{convert_concentration, ConcentrationUnit, BASE_UNIT};
use crate::config::ServiceConfig;
use crate::models::{DilutionError, DilutionForm, DilutionMethod, DilutionPlan, DilutionRequest, DilutionResult};
use crate::tools::chart::{render_plan, ChartError, PngChartRenderer, RenderedChart};

/// Inline emphasis flavour for result descriptions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Markup {
    #[default]
    Markdown,
    Html,
}

impl Markup {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "markdown" | "md" => Some(Markup::Markdown),
            "html" => Some(Markup::Html),
            _ => None,
        }
    }

    fn strong(&self, text: &str) -> String {
        match self {
            Markup::Markdown => format!("**{}**", text),
            Markup::Html => format!("<strong>{}</strong>", text),
        }
    }

    fn line_break(&self) -> &'static str {
        match self {
            Markup::Markdown => "\n",
            Markup::Html => "<br>",
        }
    }
}

fn microliters(volume: f64) -> String {
    format!("{:.2} µL", volume)
}

/// Describe a plan for the user, volumes rounded to 2 decimal places
pub fn describe_plan(plan: &DilutionPlan, markup: Markup) -> String {
    let br = markup.line_break();
    let mut out = format!("For {}:{}", plan.method.display_name(), br);

    match (plan.method, plan.intermediate_ng_per_ul, plan.steps.as_slice()) {
        (DilutionMethod::TwoStep, Some(intermediate), [first, second]) => {
            out.push_str(&format!(
                "Step 1: Dilute stock DNA to intermediate concentration of {}:{}",
                markup.strong(&format!("{:.2} {}", intermediate, BASE_UNIT)),
                br
            ));
            out.push_str(&format!(
                "Add {} of stock DNA and {} of diluent.{}{}",
                markup.strong(&microliters(first.stock_volume)),
                markup.strong(&microliters(first.diluent_volume)),
                br,
                br
            ));
            out.push_str(&format!(
                "Step 2: Dilute the intermediate solution to the target concentration:{}",
                br
            ));
            out.push_str(&format!(
                "Add {} of intermediate solution and {} of diluent.",
                markup.strong(&microliters(second.stock_volume)),
                markup.strong(&microliters(second.diluent_volume))
            ));
        }
        _ => {
            for step in &plan.steps {
                out.push_str(&format!(
                    "Add {} of stock DNA and {} of diluent (water or buffer).",
                    markup.strong(&microliters(step.stock_volume)),
                    markup.strong(&microliters(step.diluent_volume))
                ));
            }
        }
    }

    out
}

/// Parse the form and compute the plan
pub fn calculate_dilution(form: &DilutionForm) -> DilutionResult<DilutionPlan> {
    let request = DilutionRequest::from_form(form)?;
    DilutionPlan::compute(&request)
}

/// Response for a successful calculate_dilution
#[derive(Debug, Serialize)]
pub struct CalculateDilutionResponse {
    pub success: bool,
    pub description: String,
    pub plan: DilutionPlan,
    pub charts: Vec<RenderedChart>,
}

/// Response for a rejected calculate_dilution
#[derive(Debug, Serialize)]
pub struct DilutionErrorResponse {
    pub success: bool,
    pub error_kind: &'static str,
    pub message: String,
}

impl From<DilutionError> for DilutionErrorResponse {
    fn from(err: DilutionError) -> Self {
        Self {
            success: false,
            error_kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Outcome of the calculate_dilution tool
#[derive(Debug)]
pub enum CalculationOutcome {
    Computed(CalculateDilutionResponse),
    Rejected(DilutionErrorResponse),
}

/// Compute, describe and render a dilution
///
/// User input problems come back as `Rejected`; only chart failures are errors.
pub async fn calculate_and_render(
    form: &DilutionForm,
    markup: Markup,
    config: &ServiceConfig,
) -> Result<CalculationOutcome, ChartError> {
    let plan = match calculate_dilution(form) {
        Ok(plan) => plan,
        Err(err) => {
            tracing::info!("Dilution rejected: {}", err);
            return Ok(CalculationOutcome::Rejected(err.into()));
        }
    };

    let description = describe_plan(&plan, markup);

    let mut renderer = PngChartRenderer::new(config.chart_width, config.chart_height);
    if let Some(dir) = &config.chart_dir {
        renderer = renderer.with_output_dir(dir);
    }
    render_plan(&mut renderer, &plan, config.render_pacing).await?;

    Ok(CalculationOutcome::Computed(CalculateDilutionResponse {
        success: true,
        description,
        plan,
        charts: renderer.into_charts(),
    }))
}

/// Response for convert_concentration
#[derive(Debug, Serialize)]
pub struct ConvertConcentrationResponse {
    pub value: f64,
    pub from_unit: String,
    pub to_unit: String,
    pub converted: f64,
    pub ng_per_ul: f64,
    /// False when a tag was not recognized and treated as ng/µL
    pub units_recognized: bool,
}

pub fn convert_concentration_tool(value: f64, from_unit: &str, to_unit: &str) -> ConvertConcentrationResponse {
    let units_recognized =
        ConcentrationUnit::parse(from_unit).is_some() && ConcentrationUnit::parse(to_unit).is_some();

    ConvertConcentrationResponse {
        value,
        from_unit: from_unit.to_string(),
        to_unit: to_unit.to_string(),
        converted: convert_concentration(value, from_unit, to_unit),
        ng_per_ul: convert_concentration(value, from_unit, BASE_UNIT.as_str()),
        units_recognized,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn form(initial: &str, target: &str, volume: &str, steps: &str) -> DilutionForm {
        DilutionForm {
            initial_concentration: initial.to_string(),
            initial_unit: "ng/µL".to_string(),
            target_concentration: target.to_string(),
            target_unit: "ng/µL".to_string(),
            final_volume: volume.to_string(),
            steps: Some(steps.to_string()),
        }
    }

    fn config() -> ServiceConfig {
        ServiceConfig {
            chart_dir: None,
            chart_width: 200,
            chart_height: 150,
            render_pacing: Duration::ZERO,
        }
    }

    #[test]
    fn test_describe_one_step_markdown() {
        let plan = calculate_dilution(&form("100", "10", "50", "1")).unwrap();
        assert_eq!(
            describe_plan(&plan, Markup::Markdown),
            "For One-Step Dilution:\nAdd **5.00 µL** of stock DNA and **45.00 µL** of diluent (water or buffer)."
        );
    }

    #[test]
    fn test_describe_one_step_html() {
        let plan = calculate_dilution(&form("100", "10", "50", "1")).unwrap();
        assert_eq!(
            describe_plan(&plan, Markup::Html),
            "For One-Step Dilution:<br>Add <strong>5.00 µL</strong> of stock DNA and \
             <strong>45.00 µL</strong> of diluent (water or buffer)."
        );
    }

    #[test]
    fn test_describe_two_step() {
        let plan = calculate_dilution(&form("100", "10", "50", "2")).unwrap();
        let text = describe_plan(&plan, Markup::Markdown);
        assert_eq!(
            text,
            "For Two-Step Dilution:\n\
             Step 1: Dilute stock DNA to intermediate concentration of **55.00 ng/µL**:\n\
             Add **27.50 µL** of stock DNA and **22.50 µL** of diluent.\n\n\
             Step 2: Dilute the intermediate solution to the target concentration:\n\
             Add **9.09 µL** of intermediate solution and **40.91 µL** of diluent."
        );
    }

    #[test]
    fn test_describe_two_step_html() {
        let plan = calculate_dilution(&form("100", "10", "50", "2")).unwrap();
        assert_eq!(
            describe_plan(&plan, Markup::Html),
            "For Two-Step Dilution:<br>\
             Step 1: Dilute stock DNA to intermediate concentration of <strong>55.00 ng/µL</strong>:<br>\
             Add <strong>27.50 µL</strong> of stock DNA and <strong>22.50 µL</strong> of diluent.<br><br>\
             Step 2: Dilute the intermediate solution to the target concentration:<br>\
             Add <strong>9.09 µL</strong> of intermediate solution and <strong>40.91 µL</strong> of diluent."
        );
    }

    #[test]
    fn test_markup_from_str() {
        assert_eq!(Markup::from_str("HTML"), Some(Markup::Html));
        assert_eq!(Markup::from_str("md"), Some(Markup::Markdown));
        assert_eq!(Markup::from_str("rtf"), None);
    }

    #[test]
    fn test_error_response_carries_message() {
        let err = calculate_dilution(&form("abc", "10", "50", "1")).unwrap_err();
        let response = DilutionErrorResponse::from(err);
        assert!(!response.success);
        assert_eq!(response.error_kind, "invalid_input");
        assert_eq!(response.message, "Please enter valid numbers.");
    }

    #[tokio::test]
    async fn test_calculate_and_render_two_step() {
        let outcome = calculate_and_render(&form("100", "10", "50", "2"), Markup::Markdown, &config())
            .await
            .unwrap();
        let CalculationOutcome::Computed(response) = outcome else {
            panic!("expected a computed plan");
        };
        assert!(response.success);
        assert_eq!(response.charts.len(), 2);
        assert_eq!(response.charts[0].step_index, 1);
        assert_eq!(response.charts[1].step_index, 2);
        assert!(response.charts.iter().all(|c| !c.png.is_empty() && c.file_path.is_none()));
    }

    #[tokio::test]
    async fn test_calculate_and_render_rejects_without_rendering() {
        let outcome = calculate_and_render(&form("100", "150", "50", "1"), Markup::Markdown, &config())
            .await
            .unwrap();
        let CalculationOutcome::Rejected(response) = outcome else {
            panic!("expected a rejection");
        };
        assert_eq!(response.error_kind, "invalid_target");
    }

    #[tokio::test]
    async fn test_negative_target_is_rejected_not_a_chart_error() {
        let outcome = calculate_and_render(&form("100", "-10", "50", "1"), Markup::Markdown, &config())
            .await
            .unwrap();
        let CalculationOutcome::Rejected(response) = outcome else {
            panic!("expected a rejection");
        };
        assert!(!response.success);
        assert_eq!(response.error_kind, "negative_concentration");
        assert_eq!(response.message, "Concentrations cannot be negative.");
    }

    #[test]
    fn test_convert_concentration_tool() {
        let response = convert_concentration_tool(5.0, "µg/mL", "ng/µL");
        assert_eq!(response.converted, 5000.0);
        assert_eq!(response.ng_per_ul, 5000.0);
        assert!(response.units_recognized);

        let response = convert_concentration_tool(7.0, "unknown", "ng/µL");
        assert_eq!(response.converted, 7.0);
        assert!(!response.units_recognized);
    }
}
