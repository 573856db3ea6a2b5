//! Vertical card display for scan assessments.

use livestoq_core::ScanAssessment;
use livestoq_core::ml::{AgePredictionResult, DimensionWeightResult, SkinDiseaseResult};
use livestoq_store::{CREDIT_PACKAGES, Session};

const MAX_LIST_ITEMS: usize = 10;

// ── Public API ──

/// Print one assessment as a card grouped by section.
pub fn print_assessment_card(scan: &ScanAssessment) {
    println!("=== {} ===", scan.id);
    let mode = if scan.is_mock() { "  (demo mode)" } else { "" };
    println!("{}{}", scan.created_at.to_rfc3339(), mode);
    println!();

    print_prediction(scan);
    print_confidence(scan);
    if let Some(ml) = &scan.ml_analysis {
        print_dimension_weight(ml);
    }
    if let Some(skin) = &scan.skin_disease {
        print_skin(skin);
    }
    if let Some(age) = &scan.age_prediction {
        print_age(age);
    }

    println!("Images");
    for (slot, image) in &scan.images {
        println!("  {:<26} {}", slot.as_str(), image);
    }
    println!("  {:<26} {}", "analyses_run", scan.analyses_run.join(", "));
    println!();
}

/// One line per assessment, newest first.
pub fn print_history(scans: &[ScanAssessment]) {
    if scans.is_empty() {
        println!("No saved scans.");
        return;
    }
    for scan in scans {
        let p = &scan.prediction;
        print!(
            "{:<30}  {}  {:>7.1} kg  {:<6}",
            scan.id,
            scan.created_at.format("%Y-%m-%d %H:%M"),
            p.weight_kg,
            p.health_risk.as_str()
        );
        if scan.is_mock() {
            print!("  (demo)");
        }
        println!();
    }
}

pub fn print_credits(session: Option<&Session>) {
    match session {
        Some(s) => println!("{}: {} credits", s.username, s.credits),
        None => println!("Not logged in."),
    }
    println!();
    println!("Packages");
    for p in &CREDIT_PACKAGES {
        print!(
            "  {:<10} {:>3} credits  {:>12}  ({}/credit)",
            p.id,
            p.credits,
            format_idr(p.price_idr),
            format_idr(p.price_per_credit_idr())
        );
        if p.best_value {
            print!("  best value");
        }
        println!();
    }
}

// ── Sections ──

fn print_prediction(scan: &ScanAssessment) {
    let p = &scan.prediction;
    println!("Prediction");
    println!("  {:<26} {:?}", "species", p.species);
    println!("  {:<26} {:?}", "gender", p.gender);
    if let Some(months) = p.age_months {
        println!("  {:<26} {}", "age_months", months);
    }
    println!("  {:<26} {}", "age_eligibility", p.age_eligibility);
    println!("  {:<26} {:.1}", "weight_kg", p.weight_kg);
    println!("  {:<26} {}", "health_risk", p.health_risk);
    if let Some(explanation) = &p.health_risk_explanation {
        println!("  {:<26} {}", "", explanation);
    }
    println!(
        "  {:<26} {} - {}",
        "fair_price",
        format_idr(p.fair_price_idr_range.min),
        format_idr(p.fair_price_idr_range.max)
    );
    println!();
}

fn print_confidence(scan: &ScanAssessment) {
    println!("Confidence");
    for (name, value) in scan.confidence.entries() {
        println!("  {:<26} {}", name, format_percent(value));
    }
    println!();
}

fn print_dimension_weight(ml: &DimensionWeightResult) {
    println!("Body Dimensions");
    for (name, cm) in ml.dimensions.entries() {
        println!("  {:<26} {:.1}", name, cm);
    }
    println!();

    let w = &ml.weight;
    println!("Weight Estimate");
    println!("  {:<26} {:.1}", "predicted_kg", w.predicted_kg);
    println!("  {:<26} {:.1} - {:.1}", "range_kg", w.range_kg.0, w.range_kg.1);
    println!("  {:<26} {:.1}", "bcs", w.bcs);
    println!("  {:<26} {} (x{:.2})", "breed", w.breed, w.breed_factor);
    println!();

    println!("Capture Quality");
    println!("  {:<26} {}", "segmentation", format_percent(ml.segmentation.confidence));
    println!(
        "  {:<26} {:.2} m ({})",
        "distance", ml.distance.distance_m, ml.distance.method
    );
    println!(
        "  {:<26} {}{}",
        "pose",
        ml.pose.orientation,
        if ml.pose.is_valid { "" } else { " (invalid)" }
    );
    println!("  {:<26} {}", "keypoints", ml.keypoints.num_detected);
    println!();
}

fn print_skin(skin: &SkinDiseaseResult) {
    println!("Skin");
    println!("  {:<26} {}", "status", skin.overall_status.as_str());
    println!("  {:<26} {}", "confidence", format_percent(skin.overall_confidence));
    println!("  {:<26} {:.0}", "quality_score", skin.skin_quality_score);
    if !skin.conditions.is_empty() {
        println!("  conditions ({}):", skin.conditions.len());
        for c in skin.conditions.iter().take(MAX_LIST_ITEMS) {
            println!(
                "    {:<28}  {:?}  {:.1}% of area  {}",
                c.name,
                c.severity,
                c.affected_area_pct,
                format_percent(c.confidence)
            );
        }
        if skin.conditions.len() > MAX_LIST_ITEMS {
            println!("    ... and {} more", skin.conditions.len() - MAX_LIST_ITEMS);
        }
    }
    println!();
}

fn print_age(age: &AgePredictionResult) {
    println!("Age");
    println!("  {:<26} {}", "predicted_months", age.predicted_age_months);
    println!(
        "  {:<26} {} - {}",
        "range_months", age.age_range_months.0, age.age_range_months.1
    );
    println!("  {:<26} {}", "dentition_stage", age.dentition_stage);
    println!("  {:<26} {}", "wear_grade", age.wear_grade);
    println!("  {:<26} {}", "tooth_count", age.tooth_count);
    println!("  {:<26} {}", "confidence", format_percent(age.confidence));
    println!();
}

// ── Helpers ──

/// Rupiah with `.` thousands separators, e.g. `Rp 23.116.500`.
pub fn format_idr(amount: u64) -> String {
    let digits = amount.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(ch);
    }
    format!("Rp {out}")
}

pub fn format_percent(score: f64) -> String {
    format!("{:.0}%", score * 100.0)
}
