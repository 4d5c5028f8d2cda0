//! Discovery orchestration.
//!
//! One run: validate → resolve state → open one browser session → primary
//! query, optional ANZSIC-refined query, supplemental queries → merge →
//! dedupe → infer LGA → group → release session → result.
//!
//! Records are deduplicated after merging every query's output, so the same
//! obligation found by two queries appears once in the result.

use chrono::Utc;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::error::{ConfigResult, QueryError, Result, SessionError};
use crate::pipeline::dedupe::dedupe;
use crate::pipeline::extract::Extractor;
use crate::pipeline::group::{group, infer_lga};
use crate::pipeline::planner::plan_supplemental;
use crate::pipeline::session::{with_session, ResultsWait, SessionHandle};
use crate::traits::browser::{BrowserDriver, BrowserSession};
use crate::types::config::DiscoveryConfig;
use crate::types::record::ObligationRecord;
use crate::types::request::DiscoveryRequest;
use crate::types::result::{
    Confidence, DiscoveryEnvelope, DiscoveryResult, ErrorEnvelope, Jurisdiction, QueryKind,
    QueryOutcome, QueryReport, RequestEcho,
};

/// A query the run will issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedQuery {
    pub kind: QueryKind,
    pub keywords: String,
}

impl PlannedQuery {
    fn new(kind: QueryKind, keywords: impl Into<String>) -> Self {
        Self {
            kind,
            keywords: keywords.into(),
        }
    }
}

/// Runs discovery against the search site through a browser driver.
///
/// Holds no per-run state; concurrent `discover` calls each get their own
/// browser session.
///
/// # Example
///
/// ```rust,ignore
/// let discoverer = Discoverer::new(ChromiumDriver::new(), DiscoveryConfig::new())?;
/// let result = discoverer
///     .discover(&DiscoveryRequest::new("3066", "Café / Restaurant"))
///     .await?;
/// println!("{} obligations", result.total());
/// ```
pub struct Discoverer<D: BrowserDriver> {
    driver: D,
    config: DiscoveryConfig,
    extractor: Extractor,
}

impl<D: BrowserDriver> Discoverer<D> {
    /// Create a discoverer, compiling the configured markup patterns.
    pub fn new(driver: D, config: DiscoveryConfig) -> ConfigResult<Self> {
        config.postcodes.check_disjoint()?;
        let extractor = Extractor::new(&config.markup, &config.session.site_origin)?;
        Ok(Self {
            driver,
            config,
            extractor,
        })
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Queries a request will issue, in order.
    pub fn plan(&self, request: &DiscoveryRequest) -> Vec<PlannedQuery> {
        let activity = request.activity();
        let mut plan = vec![PlannedQuery::new(QueryKind::Primary, activity)];

        if let Some(code) = request.anzsic() {
            plan.push(PlannedQuery::new(
                QueryKind::Anzsic,
                format!("{} {}", activity, code),
            ));
        }

        if let Some(substances) = request.controlled() {
            plan.extend(
                plan_supplemental(substances, &self.config.phrases)
                    .into_iter()
                    .map(|phrase| PlannedQuery::new(QueryKind::Supplemental, phrase)),
            );
        }

        plan
    }

    /// Run discovery for one request.
    ///
    /// Fails only on a missing mandatory field or a browser session failure.
    /// Individual query failures contribute no records.
    pub async fn discover(&self, request: &DiscoveryRequest) -> Result<DiscoveryResult> {
        request.validate()?;

        let run_id = Uuid::now_v7();
        let span = info_span!("discovery", run_id = %run_id, postcode = %request.postcode());
        self.run(request, run_id).instrument(span).await
    }

    /// Run discovery and wrap the outcome in the matching envelope.
    pub async fn discover_envelope(
        &self,
        request: &DiscoveryRequest,
    ) -> std::result::Result<DiscoveryEnvelope, ErrorEnvelope> {
        self.discover(request)
            .await
            .map(DiscoveryResult::into_envelope)
            .map_err(|e| ErrorEnvelope::from(&e))
    }

    async fn run(&self, request: &DiscoveryRequest, run_id: Uuid) -> Result<DiscoveryResult> {
        let postcode = request.postcode();
        let state = self.config.postcodes.resolve(postcode);
        if state.is_none() {
            warn!(postcode = %postcode, "Postcode did not resolve to a state or territory");
        }

        let plan = self.plan(request);
        let supplemental_queries: Vec<String> = plan
            .iter()
            .filter(|q| q.kind == QueryKind::Supplemental)
            .map(|q| q.keywords.clone())
            .collect();

        info!(
            state = ?state,
            activity = %request.activity(),
            queries = plan.len(),
            driver = self.driver.name(),
            "Discovery starting"
        );

        let (records, reports) = with_session(&self.driver, &self.config.session, |session| {
            async move {
                let mut records = Vec::new();
                let mut reports = Vec::with_capacity(plan.len());
                for query in &plan {
                    let (found, report) = self.run_query(&session, query, postcode).await?;
                    records.extend(found);
                    reports.push(report);
                }
                Ok::<_, SessionError>((records, reports))
            }
        })
        .await??;

        let merged = dedupe(records);
        let inferred_lga = infer_lga(&merged);
        let results = group(merged);

        info!(
            total = results.len(),
            local = results.local.len(),
            state_level = results.state.len(),
            federal = results.federal.len(),
            unknown = results.unknown.len(),
            inferred_lga = ?inferred_lga,
            "Discovery complete"
        );

        Ok(DiscoveryResult {
            run_id,
            retrieved_at: Utc::now(),
            input: RequestEcho {
                postcode: postcode.to_string(),
                activity_description: request.activity().to_string(),
                anzsic_code: request.anzsic().map(str::to_string),
                business_structure: request.business_structure,
                supplemental_queries,
            },
            jurisdiction: Jurisdiction {
                state,
                inferred_lga,
            },
            datasets_used: self.config.datasets.clone(),
            results,
            confidence: Confidence::from_state(state),
            queries: reports,
        })
    }

    /// Run one query, absorbing everything but session failures.
    async fn run_query<S: BrowserSession>(
        &self,
        session: &SessionHandle<S>,
        query: &PlannedQuery,
        postcode: &str,
    ) -> std::result::Result<(Vec<ObligationRecord>, QueryReport), SessionError> {
        match session.query(&query.keywords, postcode).await {
            Ok(page) => {
                let records = self.extractor.extract(&page.markup, &query.keywords, postcode);
                let outcome = match page.wait {
                    ResultsWait::Ready { .. } => QueryOutcome::Ready,
                    ResultsWait::TimedOut => QueryOutcome::TimedOut,
                };
                info!(
                    kind = ?query.kind,
                    keywords = %query.keywords,
                    records = records.len(),
                    "Query complete"
                );
                let report = QueryReport {
                    kind: query.kind,
                    keywords: query.keywords.clone(),
                    records: records.len(),
                    outcome,
                };
                Ok((records, report))
            }
            Err(QueryError::Session(e)) => {
                warn!(keywords = %query.keywords, error = %e, "Browser session lost, aborting run");
                Err(e)
            }
            Err(e) => {
                warn!(
                    kind = ?query.kind,
                    keywords = %query.keywords,
                    error = %e,
                    "Query failed, contributing no records"
                );
                let report = QueryReport {
                    kind: query.kind,
                    keywords: query.keywords.clone(),
                    records: 0,
                    outcome: QueryOutcome::Failed {
                        reason: e.to_string(),
                    },
                };
                Ok((Vec::new(), report))
            }
        }
    }
}
