use std::time::Instant;

use crate::model::Candidate;
use crate::search::rank;

fn p95_ms(samples: &mut [f64]) -> f64 {
    samples.sort_by(|a, b| a.total_cmp(b));
    let last = samples.len().saturating_sub(1);
    let idx = ((last as f64) * 0.95).round() as usize;
    samples[idx.min(last)]
}

#[test]
fn warm_query_p95_under_budget() {
    let mut candidates: Vec<Candidate> = (0..2_000)
        .map(|i| {
            Candidate::new(i, &format!("Snippet_{i:05}"), &format!("content {i}"))
                .with_tags(&["general", "draft"])
                .with_usage((i % 17) as u32, Some(i * 1_000))
        })
        .collect();

    candidates.push(
        Candidate::new(99_999, "Q4_Report", "quarterly numbers")
            .with_tags(&["finance"])
            .with_category("reports"),
    );

    for _ in 0..5 {
        let _ = rank(&candidates, "reort");
    }

    let mut batch_p95 = Vec::with_capacity(3);
    for _ in 0..3 {
        let mut samples = Vec::with_capacity(20);
        for _ in 0..20 {
            let start = Instant::now();
            let ranked = rank(&candidates, "reort");
            samples.push(start.elapsed().as_secs_f64() * 1000.0);
            assert_eq!(ranked.first().map(|entry| entry.candidate.id), Some(99_999));
        }
        batch_p95.push(p95_ms(&mut samples));
    }

    batch_p95.sort_by(|a, b| a.total_cmp(b));
    let median_p95 = batch_p95[batch_p95.len() / 2];

    assert!(
        median_p95 <= 250.0,
        "median batch p95 too high: {median_p95:.3}ms (budget 250.0ms); batches={batch_p95:?}",
    );
}
