use owm_core::WeatherClient;
use std::time::{Duration, Instant};
use tracing::{error, info};

use crate::suite::{Case, Group};

#[derive(Debug)]
pub struct CaseOutcome {
    pub case: Case,
    pub elapsed: Duration,
    /// `Err` holds the failure rendered with its context chain.
    pub result: Result<(), String>,
}

impl CaseOutcome {
    pub fn passed(&self) -> bool {
        self.result.is_ok()
    }

    pub fn line(&self) -> String {
        let label = format!("{}/{}", self.case.group().as_str(), self.case.name());
        match &self.result {
            Ok(()) => format!("PASS  {label} ({} ms)", self.elapsed.as_millis()),
            Err(reason) => format!("FAIL  {label} ({} ms): {reason}", self.elapsed.as_millis()),
        }
    }
}

#[derive(Debug, Default)]
pub struct Summary {
    pub outcomes: Vec<CaseOutcome>,
}

impl Summary {
    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.passed()).count()
    }

    pub fn passed(&self) -> usize {
        self.outcomes.len() - self.failed()
    }
}

/// Cases in the selected groups, in declaration order. No groups selects all.
pub fn select(groups: &[Group]) -> Vec<Case> {
    Case::all()
        .iter()
        .copied()
        .filter(|c| groups.is_empty() || groups.contains(&c.group()))
        .collect()
}

/// Run cases one after another. A failing or timed-out case is recorded and
/// the run continues.
pub async fn run_cases(client: &WeatherClient, cases: &[Case], case_timeout: Duration) -> Summary {
    let mut summary = Summary::default();

    for case in cases {
        info!(group = case.group().as_str(), "Starting: {}", case.name());
        let started = Instant::now();

        let result = match tokio::time::timeout(case_timeout, case.run(client)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(format!("{err:#}")),
            Err(_) => Err(format!("timed out after {} ms", case_timeout.as_millis())),
        };

        let outcome = CaseOutcome { case: *case, elapsed: started.elapsed(), result };
        if let Err(reason) = &outcome.result {
            error!(group = case.group().as_str(), "Failed: {}: {reason}", case.name());
        }
        println!("{}", outcome.line());
        summary.outcomes.push(outcome);
    }

    summary
}
