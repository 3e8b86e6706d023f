// ABOUTME: Scenario tests for quality and reliability scoring through the public API.
// ABOUTME: Checks the score bands downstream consumers rely on when ranking extractions.

use pagelens::{
    quality_score, reliability_for_name, reliability_score, ArticleContent, ArticleMetadata,
    ExtractionMethod, QualityInput,
};

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[test]
fn rich_structured_article_scores_high() {
    let metadata = ArticleMetadata {
        author: Some("Alice".into()),
        published_date: Some("2024-03-01T00:00:00+00:00".into()),
        reading_time: Some(8),
        images: vec!["https://example.com/a.png".into()],
        code_blocks: vec!["fn main() {}".into()],
        ..Default::default()
    };
    let article = ArticleContent {
        url: "https://example.com/a".into(),
        title: "A thorough guide to async Rust".into(),
        content: "word ".repeat(500),
        metadata,
        extraction_method: ExtractionMethod::StructuredData,
        quality_score: 0.0,
        reliability_score: 0.0,
        site: "generic".into(),
        used_selectors: vec!["json-ld".into()],
    };
    let score = quality_score(&QualityInput::from(&article));
    assert!(score > 0.9, "score {score}");
    assert!(approx(score, 1.0));
}

#[test]
fn short_site_specific_article_is_middling() {
    let metadata = ArticleMetadata {
        author: Some("著者".into()),
        ..Default::default()
    };
    let body = "あ".repeat(800);
    let score = quality_score(&QualityInput {
        title: Some("記事"),
        content: Some(&body),
        metadata: Some(&metadata),
        method: Some(ExtractionMethod::SiteSpecific),
    });
    assert!((0.4..0.8).contains(&score), "score {score}");
    assert!(approx(score, 0.4));
}

#[test]
fn thin_fallback_scores_low() {
    let score = quality_score(&QualityInput {
        title: Some("短い"),
        content: Some("少ない内容"),
        metadata: None,
        method: Some(ExtractionMethod::Fallback),
    });
    assert!(score < 0.4, "score {score}");
    assert!(approx(score, 0.125));
}

#[test]
fn scores_stay_in_unit_range() {
    let long_title = "t".repeat(300);
    let long_body = "x".repeat(10_000);
    for method in ExtractionMethod::ALL {
        for (title, content) in [("", ""), ("Title", "body"), (long_title.as_str(), long_body.as_str())] {
            let score = quality_score(&QualityInput {
                title: Some(title),
                content: Some(content),
                metadata: None,
                method: Some(method),
            });
            assert!((0.0..=1.0).contains(&score), "{method} {score}");
        }
    }
}

#[test]
fn reliability_scenarios() {
    assert!(approx(reliability_for_name("structured-data", &["json-ld"]), 1.0));
    assert!(approx(reliability_for_name("fallback", &["p"]), 0.45));
    assert!(approx(reliability_for_name("guesswork", &[] as &[&str]), 0.3));
    let many = ["a", "b", "c", "d", "e", "f"];
    assert!(approx(reliability_score(ExtractionMethod::MetaTags, &many), 0.9));
}
