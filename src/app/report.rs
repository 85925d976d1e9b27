use crate::domain::model::{DisplayPayload, PipelineState};
use std::fmt;

/// 將結果轉成終端顯示文字
pub fn render_text(payload: &DisplayPayload) -> String {
    TextReport(payload).to_string()
}

struct TextReport<'a>(&'a DisplayPayload);

impl fmt::Display for TextReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let payload = self.0;

        if let Some(failure) = &payload.failure {
            return writeln!(f, "❌ {}", failure);
        }

        if let Some(label) = &payload.label {
            writeln!(f, "Type of injury is")?;
            writeln!(
                f,
                "  {}\n",
                payload.label_text.as_deref().unwrap_or(label.as_str())
            )?;
        }

        if let Some(advice) = &payload.advice {
            writeln!(f, "First Aid Recommendations")?;
            write_indented(f, advice)?;
            writeln!(f)?;
        }

        writeln!(f, "Nearby Hospitals:")?;
        if let Some(coordinates) = &payload.coordinates {
            match coordinates.describe() {
                Some(place) => writeln!(f, "  Location: {} ({})", coordinates, place)?,
                None => writeln!(f, "  Location: {}", coordinates)?,
            }
        }

        if payload.hospitals.is_empty() {
            writeln!(f, "  No hospitals found within the specified radius.")?;
        } else {
            writeln!(f, "  Found {} hospitals nearby:", payload.hospitals.len())?;
            for hospital in &payload.hospitals {
                writeln!(f, "  - {}", hospital.name)?;
                if !hospital.address.is_empty() {
                    writeln!(f, "    Address: {}", hospital.address)?;
                }
                writeln!(f, "    {}", hospital.map_link)?;
            }
        }

        if let Some(narrative) = &payload.hospital_narrative {
            writeln!(f)?;
            write_indented(f, narrative)?;
        }

        if !payload.errors.is_empty() {
            writeln!(f)?;
            for error in &payload.errors {
                writeln!(f, "⚠️ {}: {}", stage_title(error.stage), error.message)?;
            }
        }

        Ok(())
    }
}

fn write_indented(f: &mut fmt::Formatter<'_>, text: &str) -> fmt::Result {
    text.lines().try_for_each(|line| writeln!(f, "  {}", line))
}

fn stage_title(stage: PipelineState) -> &'static str {
    match stage {
        PipelineState::Classifying => "Classification",
        PipelineState::AdviceGenerating => "First aid",
        PipelineState::HospitalLookup => "Hospitals",
        PipelineState::NarrativeGenerating => "Hospital guide",
        _ => "Pipeline",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{
        Classification, Coordinates, HospitalRecord, HospitalSearch, RequestContext, Submission,
    };

    fn rendered_context() -> RequestContext {
        let mut context = RequestContext::new(Submission::Text("burned my hand".to_string()));
        let mut coordinates = Coordinates::new(19.07, 72.87);
        coordinates.city = Some("Mumbai".to_string());
        context.coordinates = Some(coordinates);
        context.advice = Some("Cool the burn.\nCover loosely.".to_string());
        context.hospitals = Some(HospitalSearch::Found(vec![HospitalRecord {
            name: "Lilavati Hospital".to_string(),
            address: "Bandra West".to_string(),
            map_link: "https://www.google.com/maps/search/?q=Hospital+Lilavati+Hospital&hl=en"
                .to_string(),
        }]));
        context.transition(PipelineState::Rendered);
        context
    }

    #[test]
    fn test_render_success() {
        let payload = DisplayPayload::from_context(rendered_context(), None);
        let text = render_text(&payload);

        assert!(text.contains("First Aid Recommendations\n  Cool the burn.\n  Cover loosely.\n"));
        assert!(text.contains("Location: Latitude 19.07, Longitude 72.87 (Mumbai)"));
        assert!(text.contains("Found 1 hospitals nearby"));
        assert!(text.contains("?q=Hospital+Lilavati+Hospital&hl=en"));
        assert!(!text.contains("Type of injury"));
    }

    #[test]
    fn test_render_label_and_stage_errors() {
        let mut context = rendered_context();
        context.classification = Some(Classification::parse("Burns").unwrap());
        context.hospitals = Some(HospitalSearch::Unavailable("503".to_string()));
        context.record_error(PipelineState::HospitalLookup, "Hospital search unavailable: 503");

        let text = render_text(&DisplayPayload::from_context(context, None));
        assert!(text.contains("Type of injury is\n  Burns\n"));
        assert!(text.contains("No hospitals found"));
        assert!(text.contains("⚠️ Hospitals: Hospital search unavailable: 503"));
    }

    #[test]
    fn test_render_failure_shows_only_message() {
        let mut context = rendered_context();
        context.discard_partial_results();
        let payload = DisplayPayload::from_context(
            context,
            Some("Could not determine your current location.".to_string()),
        );

        assert_eq!(
            render_text(&payload),
            "❌ Could not determine your current location.\n"
        );
    }
}
