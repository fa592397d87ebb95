//! End-to-end run orchestration.
//!
//! A run flows strictly forward: diagnose, discover (once, cached), narrate,
//! lay out. Data and schema errors abort before any backend traffic; an
//! immaterial loss short-circuits to the sentinel without discovery. When
//! the narrative is configured as optional, backend unavailability downgrades
//! to the sentinel and the numeric report still ships.

use chrono::Utc;
use tracing::{info, warn};
use trendspotter_backends::discover;
use trendspotter_config::AppConfig;
use trendspotter_core::backend::{Backend, ModelCapability};
use trendspotter_core::error::{BackendError, Error, Result};
use trendspotter_core::page::{ChartHandle, PageDescription};
use trendspotter_core::payload::{ContextPayload, NarrativeResult};
use trendspotter_core::record::Record;
use trendspotter_core::stats::DiagnosticResult;
use trendspotter_diagnosis::diagnose;
use trendspotter_layout::{lay_out, LayoutOptions};
use trendspotter_narrative::{narrate, NarrativeOptions};
use uuid::Uuid;

/// Per-run state: configuration snapshot plus the discovered capability.
///
/// Discovery runs at most once per context; the winning capability is cached
/// and reused for every subsequent call.
pub struct RunContext {
    pub run_id: Uuid,
    pub config: AppConfig,
    capability: Option<ModelCapability>,
}

impl RunContext {
    pub fn new(config: AppConfig) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            config,
            capability: None,
        }
    }

    /// The capability to generate with, discovering it on first use.
    pub async fn capability(
        &mut self,
        backend: &dyn Backend,
    ) -> std::result::Result<ModelCapability, BackendError> {
        if let Some(cap) = &self.capability {
            return Ok(cap.clone());
        }

        let timeout = std::time::Duration::from_secs(self.config.backend.timeout_secs);
        let cap = discover(backend, &self.config.backend.preferences, timeout).await?;
        self.capability = Some(cap.clone());
        Ok(cap)
    }
}

/// Everything a run produced, for callers that need more than the page.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub run_id: Uuid,
    pub diagnostic: DiagnosticResult,
    pub narrative: NarrativeResult,
    pub page: PageDescription,
}

/// Execute one full diagnosis run over already-loaded records.
pub async fn run(
    ctx: &mut RunContext,
    backend: &dyn Backend,
    records: &[Record],
) -> Result<RunOutcome> {
    let diagnostic = diagnose(
        records,
        ctx.config.diagnosis.metric,
        ctx.config.diagnosis.tie_epsilon,
    )?;

    info!(
        run_id = %ctx.run_id,
        segment = %diagnostic.segment,
        loss = diagnostic.loss_magnitude,
        metric = %diagnostic.metric,
        "Diagnosis complete"
    );

    let payload = ContextPayload::from_diagnostic(&diagnostic, &ctx.config.diagnosis.units);

    let (narrative, model) = narrative_step(ctx, backend, &payload).await?;

    let layout = lay_out(narrative.text(), &layout_options(&ctx.config))?;

    let loss_display = if payload.is_rate_metric() {
        format!("{:.1}%", diagnostic.loss_magnitude * 100.0)
    } else {
        format!(
            "{:.2} {}",
            diagnostic.loss_magnitude, ctx.config.diagnosis.units
        )
    };

    let page = PageDescription {
        heading: format!("Worst Performing Segment: {}", diagnostic.segment),
        subheading: format!(
            "{} loss of {} across {} rows",
            diagnostic.metric, loss_display, diagnostic.segment_count,
        ),
        layout,
        chart: ChartHandle {
            id: format!("chart-{}", ctx.run_id),
            title: format!("Profit by {}", ctx.config.schema.dimension),
        },
        model,
        generated_at: Utc::now(),
    };

    Ok(RunOutcome {
        run_id: ctx.run_id,
        diagnostic,
        narrative,
        page,
    })
}

/// Discovery plus the single narrative call.
///
/// The materiality check runs before discovery so an immaterial loss causes
/// zero backend traffic. With `narrative.required = false`, availability
/// errors downgrade to the sentinel.
async fn narrative_step(
    ctx: &mut RunContext,
    backend: &dyn Backend,
    payload: &ContextPayload,
) -> Result<(NarrativeResult, Option<String>)> {
    if payload.loss_magnitude < ctx.config.narrative.materiality_threshold {
        info!(
            loss = payload.loss_magnitude,
            threshold = ctx.config.narrative.materiality_threshold,
            "Loss not material, skipping backend entirely"
        );
        return Ok((NarrativeResult::Inconclusive, None));
    }

    let required = ctx.config.narrative.required;

    let capability = match ctx.capability(backend).await {
        Ok(cap) => cap,
        Err(e) if !required => {
            warn!(error = %e, "Discovery failed; narrative is optional, using sentinel");
            return Ok((NarrativeResult::Inconclusive, None));
        }
        Err(e) => return Err(Error::Backend(e)),
    };

    let opts = narrative_options(&ctx.config);
    match narrate(payload, &capability, backend, &opts).await {
        Ok(result) => Ok((result, Some(capability.model))),
        Err(e) if !required => {
            warn!(error = %e, "Narrative call failed; optional, using sentinel");
            Ok((NarrativeResult::Inconclusive, Some(capability.model)))
        }
        Err(e) => Err(Error::Backend(e)),
    }
}

fn narrative_options(config: &AppConfig) -> NarrativeOptions {
    NarrativeOptions {
        materiality_threshold: config.narrative.materiality_threshold,
        numeric_tolerance: config.narrative.numeric_tolerance,
        temperature: config.narrative.temperature,
        top_k: config.narrative.top_k,
        max_narrative_chars: config.narrative.max_narrative_chars,
        timeout: std::time::Duration::from_secs(config.backend.timeout_secs),
    }
}

fn layout_options(config: &AppConfig) -> LayoutOptions {
    LayoutOptions {
        page_width: config.layout.page_width,
        page_height: config.layout.page_height,
        margin: config.layout.margin,
        heading_height: config.layout.heading_height,
        glyph_width: config.layout.glyph_width,
        line_height: config.layout.line_height,
        min_line_height: config.layout.min_line_height,
        chart_height: config.layout.chart_height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use trendspotter_core::backend::{GenerateRequest, GenerateResponse};

    /// A backend that counts every call and answers with a fixed narrative.
    struct CountingBackend {
        reply: String,
        list_calls: Mutex<usize>,
        probe_calls: Mutex<usize>,
        generate_calls: Mutex<usize>,
        down: bool,
    }

    impl CountingBackend {
        fn new(reply: &str) -> Self {
            Self {
                reply: reply.into(),
                list_calls: Mutex::new(0),
                probe_calls: Mutex::new(0),
                generate_calls: Mutex::new(0),
                down: false,
            }
        }

        fn unreachable_backend() -> Self {
            Self {
                down: true,
                ..Self::new("")
            }
        }

        fn total_calls(&self) -> usize {
            *self.list_calls.lock().unwrap()
                + *self.probe_calls.lock().unwrap()
                + *self.generate_calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl Backend for CountingBackend {
        fn name(&self) -> &str {
            "counting"
        }

        async fn list_models(&self) -> std::result::Result<Vec<String>, BackendError> {
            *self.list_calls.lock().unwrap() += 1;
            if self.down {
                return Err(BackendError::Network("unreachable".into()));
            }
            Ok(vec![
                "models/gemini-1.5-pro".into(),
                "models/gemini-1.5-flash".into(),
            ])
        }

        async fn probe(&self, _model: &str) -> std::result::Result<(), BackendError> {
            *self.probe_calls.lock().unwrap() += 1;
            if self.down {
                return Err(BackendError::Network("unreachable".into()));
            }
            Ok(())
        }

        async fn generate(
            &self,
            model: &str,
            _request: GenerateRequest,
        ) -> std::result::Result<GenerateResponse, BackendError> {
            *self.generate_calls.lock().unwrap() += 1;
            if self.down {
                return Err(BackendError::Network("unreachable".into()));
            }
            Ok(GenerateResponse {
                text: self.reply.clone(),
                model: model.to_string(),
            })
        }
    }

    fn records() -> Vec<Record> {
        vec![
            Record::new("Furniture", 0.30, -900.0),
            Record::new("Furniture", 0.30, -600.0),
            Record::new("Technology", 0.10, 800.0),
            Record::new("Office Supplies", 0.05, 300.0),
        ]
    }

    fn grounded_reply() -> String {
        // Loss 1500.00, mean discount 30%, 2 of 4 rows.
        "Cause: the Furniture segment lost 1500.00 USD across 2 of 4 rows at a 30% \
         average discount.\nAction: rein in Furniture discounting."
            .to_string()
    }

    #[tokio::test]
    async fn full_run_produces_a_page() {
        let backend = CountingBackend::new(&grounded_reply());
        let mut ctx = RunContext::new(AppConfig::default());

        let outcome = run(&mut ctx, &backend, &records()).await.unwrap();

        assert_eq!(outcome.diagnostic.segment, "Furniture");
        assert!(!outcome.narrative.is_inconclusive());
        assert_eq!(
            outcome.page.model.as_deref(),
            Some("models/gemini-1.5-pro")
        );
        assert!(outcome.page.heading.contains("Furniture"));
        assert!(!outcome.page.layout.lines.is_empty());
    }

    #[tokio::test]
    async fn empty_dataset_aborts_before_any_backend_call() {
        let backend = CountingBackend::new(&grounded_reply());
        let mut ctx = RunContext::new(AppConfig::default());

        let err = run(&mut ctx, &backend, &[]).await.unwrap_err();
        assert!(matches!(err, Error::Diagnosis(_)));
        assert_eq!(backend.total_calls(), 0);
    }

    #[tokio::test]
    async fn immaterial_loss_skips_discovery() {
        let backend = CountingBackend::new(&grounded_reply());
        let mut config = AppConfig::default();
        config.narrative.materiality_threshold = 10_000.0;
        let mut ctx = RunContext::new(config);

        let outcome = run(&mut ctx, &backend, &records()).await.unwrap();
        assert!(outcome.narrative.is_inconclusive());
        assert!(outcome.page.model.is_none());
        assert_eq!(backend.total_calls(), 0);
    }

    #[tokio::test]
    async fn unreachable_backend_fails_a_required_narrative() {
        let backend = CountingBackend::unreachable_backend();
        let mut ctx = RunContext::new(AppConfig::default());

        let err = run(&mut ctx, &backend, &records()).await.unwrap_err();
        assert!(matches!(err, Error::Backend(BackendError::Network(_))));
    }

    #[tokio::test]
    async fn optional_narrative_downgrades_to_sentinel() {
        let backend = CountingBackend::unreachable_backend();
        let mut config = AppConfig::default();
        config.narrative.required = false;
        let mut ctx = RunContext::new(config);

        let outcome = run(&mut ctx, &backend, &records()).await.unwrap();
        assert!(outcome.narrative.is_inconclusive());
        // The sentinel still ships on the page.
        assert_eq!(outcome.page.layout.lines[0].content, "Data Inconclusive");
    }

    #[tokio::test]
    async fn capability_is_discovered_once_per_context() {
        let backend = CountingBackend::new(&grounded_reply());
        let mut ctx = RunContext::new(AppConfig::default());

        run(&mut ctx, &backend, &records()).await.unwrap();
        run(&mut ctx, &backend, &records()).await.unwrap();

        assert_eq!(*backend.list_calls.lock().unwrap(), 1);
        assert_eq!(*backend.probe_calls.lock().unwrap(), 1);
        assert_eq!(*backend.generate_calls.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn hallucinated_reply_ships_as_sentinel_not_error() {
        let backend = CountingBackend::new(
            "Cause: an 85% discount destroyed margins.\nAction: stop it.",
        );
        let mut ctx = RunContext::new(AppConfig::default());

        let outcome = run(&mut ctx, &backend, &records()).await.unwrap();
        assert!(outcome.narrative.is_inconclusive());
        assert_eq!(outcome.page.layout.lines[0].content, "Data Inconclusive");
    }
}
