// Metrics Deriver
// Pure functions from stored records to derived ratios. Portfolio figures are
// ratios of sums, never averages of per-campaign ratios.

use crate::model::CampaignRecord;
use serde::{Deserialize, Serialize};

/// Cost per lead: spend / leads, zero when there are no leads
pub fn cost_per_lead(spend: f64, leads_generated: i64) -> f64 {
    if leads_generated == 0 {
        return 0.0;
    }
    spend / leads_generated as f64
}

/// Return on investment in percent: (revenue - spend) / spend * 100, zero when spend is zero
pub fn return_on_investment(revenue: f64, spend: f64) -> f64 {
    if spend == 0.0 {
        return 0.0;
    }
    (revenue - spend) / spend * 100.0
}

/// Conversion rate in percent: conversions / leads * 100, zero when there are no leads
pub fn conversion_rate(conversions: i64, leads_generated: i64) -> f64 {
    if leads_generated == 0 {
        return 0.0;
    }
    conversions as f64 / leads_generated as f64 * 100.0
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignMetrics {
    pub cost_per_lead: f64,
    pub return_on_investment: f64,
    pub conversion_rate: f64,
}

/// Derived ratios for one record
pub fn derive(record: &CampaignRecord) -> CampaignMetrics {
    CampaignMetrics {
        cost_per_lead: cost_per_lead(record.spend, record.leads_generated),
        return_on_investment: return_on_investment(record.revenue, record.spend),
        conversion_rate: conversion_rate(record.conversions, record.leads_generated),
    }
}

/// Totals and overall ratios across a set of campaigns
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioSummary {
    pub campaign_count: usize,
    pub total_spend: f64,
    pub total_revenue: f64,
    pub total_leads: i64,
    pub total_conversions: i64,
    pub average_cost_per_lead: f64,
    pub total_return_on_investment: f64,
    pub average_conversion_rate: f64,
}

pub fn summarize<'a, I>(records: I) -> PortfolioSummary
where
    I: IntoIterator<Item = &'a CampaignRecord>,
{
    let mut summary = PortfolioSummary::default();

    for record in records {
        summary.campaign_count += 1;
        summary.total_spend += record.spend;
        summary.total_revenue += record.revenue;
        summary.total_leads += record.leads_generated;
        summary.total_conversions += record.conversions;
    }

    summary.average_cost_per_lead = cost_per_lead(summary.total_spend, summary.total_leads);
    summary.total_return_on_investment =
        return_on_investment(summary.total_revenue, summary.total_spend);
    summary.average_conversion_rate =
        conversion_rate(summary.total_conversions, summary.total_leads);

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CampaignStatus;
    use chrono::NaiveDate;

    fn record(spend: f64, leads: i64, conversions: i64, revenue: f64) -> CampaignRecord {
        CampaignRecord {
            name: "test".to_string(),
            status: CampaignStatus::Active,
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: None,
            spend,
            leads_generated: leads,
            conversions,
            revenue,
        }
    }

    #[test]
    fn test_ratios() {
        let metrics = derive(&record(1000.0, 50, 10, 3000.0));
        assert_eq!(metrics.cost_per_lead, 20.0);
        assert_eq!(metrics.return_on_investment, 200.0);
        assert_eq!(metrics.conversion_rate, 20.0);
    }

    #[test]
    fn test_zero_denominators() {
        let metrics = derive(&record(0.0, 0, 0, 500.0));
        assert_eq!(metrics.cost_per_lead, 0.0);
        assert_eq!(metrics.return_on_investment, 0.0);
        assert_eq!(metrics.conversion_rate, 0.0);
    }

    #[test]
    fn test_negative_roi() {
        assert_eq!(return_on_investment(500.0, 1000.0), -50.0);
    }

    #[test]
    fn test_summary_is_ratio_of_sums() {
        let records = vec![record(100.0, 10, 1, 0.0), record(300.0, 10, 9, 800.0)];
        let summary = summarize(&records);

        assert_eq!(summary.campaign_count, 2);
        assert_eq!(summary.total_spend, 400.0);
        assert_eq!(summary.total_leads, 20);
        assert_eq!(summary.average_cost_per_lead, 20.0);
        assert_eq!(summary.total_return_on_investment, 100.0);
        assert_eq!(summary.average_conversion_rate, 50.0);
    }

    #[test]
    fn test_empty_summary() {
        let summary = summarize(&Vec::<CampaignRecord>::new());
        assert_eq!(summary, PortfolioSummary::default());
    }
}
