//! Feature engine orchestration
//!
//! Runs the analyzers over one shared, read-only transaction slice and joins
//! their outputs per transaction. The benchmark, deviation and priority chain
//! runs concurrently with the demand and concentration analyzers.
//!
//! Partitioned runs collect each analyzer's partial ledger per partition in
//! parallel, merge the ledgers, and compute every median, profile and index
//! from the merged, complete state.

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use procura_data::Transaction;
use procura_output::{OpportunityRadar, RunSummary};
use procura_risk::{
    BenchmarkEstimator, BenchmarkSamples, BenchmarkTable, ConcentrationAnalyzer,
    ConcentrationTable, DemandAnalyzer, DemandLedger, DemandTable, DeviationScorer,
    EnrichedTransaction, FeatureAssembler, PriceScores, PriorityIndexer, PriorityTable, RiskError,
    SupplierLedger,
};
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

/// How a partitioned run splits the transaction set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Partitioning {
    /// One partition per purchase year
    Year,
    /// `n` contiguous ranges of sorted product keys
    ProductBuckets(usize),
}

/// Derived tables of a run, for dimension construction and reporting.
#[derive(Debug, Clone)]
pub struct AnalysisTables {
    /// Benchmark groups
    pub benchmarks: BenchmarkTable,
    /// Price assessments in input order, with the clamp in effect
    pub prices: PriceScores,
    /// Demand profiles per product
    pub demand: DemandTable,
    /// Supplier concentration per aggregate
    pub concentration: ConcentrationTable,
    /// Priority per product
    pub priority: PriorityTable,
}

/// Result of an engine run.
#[derive(Debug, Clone)]
pub struct EngineOutput {
    /// One enriched record per input transaction, in input order
    pub enriched: Vec<EnrichedTransaction>,
    /// Auxiliary tables
    pub tables: AnalysisTables,
}

impl EngineOutput {
    /// Consolidated run statistics.
    pub fn summary(&self) -> RunSummary {
        RunSummary::new(&self.enriched, &self.tables.benchmarks)
    }

    /// Opportunity radar over the scored records.
    pub fn radar(&self) -> OpportunityRadar {
        OpportunityRadar::from_enriched(&self.enriched)
    }
}

/// Benchmark and risk feature engine
#[derive(Debug, Clone)]
pub struct FeatureEngine {
    config: EngineConfig,
    estimator: BenchmarkEstimator,
    scorer: DeviationScorer,
    demand: DemandAnalyzer,
    concentration: ConcentrationAnalyzer,
    priority: PriorityIndexer,
}

impl FeatureEngine {
    /// Create a new engine, validating every analyzer's configuration.
    pub fn new(config: EngineConfig) -> Result<Self> {
        let estimator = BenchmarkEstimator::new(config.benchmark.clone()).map_err(RiskError::from)?;
        let scorer = DeviationScorer::new(config.deviation.clone()).map_err(RiskError::from)?;
        let demand = DemandAnalyzer::new(config.demand.clone()).map_err(RiskError::from)?;
        let concentration =
            ConcentrationAnalyzer::new(config.concentration.clone()).map_err(RiskError::from)?;
        let priority = PriorityIndexer::new(config.priority.clone()).map_err(RiskError::from)?;

        Ok(Self {
            config,
            estimator,
            scorer,
            demand,
            concentration,
            priority,
        })
    }

    /// Engine configuration.
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Enrich the whole transaction set in one pass.
    pub fn run(&self, transactions: &[Transaction]) -> Result<EngineOutput> {
        if transactions.is_empty() {
            return Err(EngineError::EmptyTransactionSet);
        }
        tracing::info!(records = transactions.len(), "engine run started");

        let ((benchmarks, (prices, priority)), (demand, concentration)) = rayon::join(
            || {
                let benchmarks = self.estimator.estimate(transactions);
                let scored = self.score(transactions, &benchmarks);
                (benchmarks, scored)
            },
            || {
                rayon::join(
                    || self.demand.analyze(transactions),
                    || self.concentration.analyze(transactions),
                )
            },
        );

        self.assemble(
            transactions,
            AnalysisTables {
                benchmarks,
                prices,
                demand,
                concentration,
                priority: priority?,
            },
        )
    }

    /// Enrich the transaction set partition by partition.
    ///
    /// Partial ledgers are collected in parallel, merged in partition order,
    /// then finalized once. Output matches [`run`](Self::run) up to floating
    /// summation order.
    pub fn run_partitioned(
        &self,
        transactions: &[Transaction],
        partitioning: Partitioning,
    ) -> Result<EngineOutput> {
        if transactions.is_empty() {
            return Err(EngineError::EmptyTransactionSet);
        }
        let partitions = partition(transactions, partitioning)?;
        tracing::info!(
            records = transactions.len(),
            partitions = partitions.len(),
            ?partitioning,
            "partitioned engine run started"
        );

        let benchmark_config = self.estimator.config();
        let granularity = self.demand.config().granularity;
        let scope = self.concentration.config().scope;

        let partials: Vec<(BenchmarkSamples, DemandLedger, SupplierLedger)> = partitions
            .par_iter()
            .map(|part| {
                (
                    BenchmarkSamples::collect(part.iter().copied(), benchmark_config),
                    DemandLedger::collect(part.iter().copied(), granularity),
                    SupplierLedger::collect(part.iter().copied(), scope),
                )
            })
            .collect();

        let mut samples = BenchmarkSamples::default();
        let mut demand = DemandLedger::new(granularity);
        let mut suppliers = SupplierLedger::new(scope);
        for (s, d, c) in partials {
            samples.merge(s);
            demand.merge(d);
            suppliers.merge(c);
        }
        tracing::debug!(
            benchmark_groups = samples.len(),
            supplier_aggregates = suppliers.len(),
            "partial ledgers merged"
        );

        let benchmarks = samples.finalize(benchmark_config);
        let (prices, priority) = self.score(transactions, &benchmarks);
        self.assemble(
            transactions,
            AnalysisTables {
                benchmarks,
                prices,
                demand: demand.finalize(self.demand.config()),
                concentration: suppliers.finalize(self.concentration.config()),
                priority: priority?,
            },
        )
    }

    fn score(
        &self,
        transactions: &[Transaction],
        benchmarks: &BenchmarkTable,
    ) -> (PriceScores, Result<PriorityTable>) {
        let prices = self.scorer.score(transactions, benchmarks);
        let priority = self
            .priority
            .compute(transactions, &prices)
            .map_err(|e| EngineError::Risk(e.into()));
        (prices, priority)
    }

    fn assemble(&self, transactions: &[Transaction], tables: AnalysisTables) -> Result<EngineOutput> {
        let enriched = FeatureAssembler
            .assemble(
                transactions,
                &tables.prices,
                &tables.demand,
                &tables.concentration,
                &tables.priority,
            )
            .map_err(RiskError::from)?;

        tracing::info!(
            records = enriched.len(),
            scored = tables.prices.scored_count(),
            unscored = tables.prices.unscored_count(),
            benchmark_groups = tables.benchmarks.len(),
            valid_groups = tables.benchmarks.valid_count(),
            "engine run finished"
        );
        Ok(EngineOutput { enriched, tables })
    }
}

fn partition(
    transactions: &[Transaction],
    partitioning: Partitioning,
) -> Result<Vec<Vec<&Transaction>>> {
    let mut parts: BTreeMap<i64, Vec<&Transaction>> = BTreeMap::new();
    match partitioning {
        Partitioning::Year => {
            for tx in transactions {
                parts.entry(i64::from(tx.year())).or_default().push(tx);
            }
        }
        Partitioning::ProductBuckets(0) => {
            return Err(EngineError::InvalidPartitioning(
                "product bucket count must be at least 1".to_string(),
            ));
        }
        Partitioning::ProductBuckets(n) => {
            let keys: BTreeSet<&str> = transactions.iter().map(|t| t.product_key.as_str()).collect();
            let bucket_of: BTreeMap<&str, i64> = keys
                .iter()
                .enumerate()
                .map(|(i, k)| (*k, (i * n / keys.len()) as i64))
                .collect();
            for tx in transactions {
                let bucket = bucket_of.get(tx.product_key.as_str()).copied().unwrap_or(0);
                parts.entry(bucket).or_default().push(tx);
            }
        }
    }
    Ok(parts.into_values().collect())
}
