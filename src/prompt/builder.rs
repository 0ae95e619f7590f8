use serde::Serialize;
use std::sync::Arc;
use tera::Context;

use super::engine::TeraEngine;
use crate::error::PromptError;
use crate::metrics::MetricReport;
use crate::metrics::structure::OPENING_WINDOW;
use crate::policy::{
    AcceptanceVerdict, Criterion, META_DESCRIPTION_CHARS, SEO_TITLE_CHARS, STEP_RANGE,
    StructureDefect, Thresholds, Violation, structure_defects,
};
use crate::style::StyleGuide;

const DRAFT: &str = "draft";
const EDIT: &str = "edit";
const CORRECTIVE: &str = "corrective";

const DRAFT_TEMPLATE: &str = "\
Erstelle einen Rohentwurf für einen Artikel gemäß Stilguide.
Thema: {{ topic }}
Pflichtdetails: {{ details }}
Zielgruppe: Menschen auf Reisen, die draußen im Van/Zelt/Camper kochen.
{% if keyword %}Fokus-Keyword: {{ keyword }} (in die H1 und in die ersten {{ opening_window }} Wörter).
{% endif %}{% if layout %}Aufbau: {{ layout }}
{% endif %}{% if length %}Länge: {{ length }}. {% endif %}Gib NUR den Artikeltext zurück, ohne Vorbemerkungen oder Wortzahlen.

Stilguide:
{{ styleguide }}
";

const EDIT_TEMPLATE: &str = "\
Überarbeite den folgenden Text gemäß Stilguide:
- Entferne Floskeln aus der Negativliste: {{ negative }}
- Variiere Satzlängen (kurz + lang).
- Schreibe aus der Ich/Wir-Perspektive und lass 1 persönliche Meinung stehen.
- Füge 1–2 konkrete Beobachtungen aus der Draußen-Situation ein (Geräusche, Geruch, Textur).
- Nenne konkrete Mengen, Zeiten und Temperaturen.
- Verwende aktive Verben.
{% if layout %}- Erhalte den Aufbau: {{ layout }}
{% endif %}{% if length %}- Halte die Länge {{ length }} (keine Wortzahl ausgeben).
{% endif %}- Gib NUR den finalen Text zurück.

Stilguide:
{{ styleguide }}
{% if examples %}
Beispiele (Tonfallreferenz):
{{ examples }}
{% endif %}
Text:
{{ text }}
";

const CORRECTIVE_TEMPLATE: &str = "\
Überarbeite den Text erneut. Er verfehlt diese Prüfkriterien (gemessen, Ziel):
{% for v in violations %}- {{ v.label }}: {{ v.observed }} (Ziel {{ v.op }} {{ v.target }})
{% endfor %}
Ziele:
{% for goal in goals %}- {{ goal }}
{% endfor %}{% if length %}- Halte die Länge {{ length }} (keine Wortzahl ausgeben).
{% endif %}- Gib NUR den finalen Text zurück.
{% if focus %}
{{ focus }}
{% endif %}
Stilguide:
{{ styleguide }}

Text:
{{ text }}
";

/// What the style editor is asked to do with a candidate.
#[derive(Debug, Clone, Copy)]
pub enum EditInstruction<'a> {
    /// First stylistic pass over the draft.
    Initial,
    /// Repair pass listing the failed checks of the latest candidate.
    Corrective {
        verdict: &'a AcceptanceVerdict,
        report: &'a MetricReport,
        keyword: Option<&'a str>,
    },
}

/// Emphasis of a corrective prompt, chosen from the failed checks in
/// priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairFocus {
    AddressForm,
    Expand,
    Condense,
    General,
}

impl RepairFocus {
    pub fn from_verdict(verdict: &AcceptanceVerdict) -> Self {
        if verdict.violates(Criterion::FormalAddress) || verdict.violates(Criterion::SecondPerson)
        {
            Self::AddressForm
        } else if verdict.violates(Criterion::MinWords) {
            Self::Expand
        } else if verdict.violates(Criterion::MaxWords) {
            Self::Condense
        } else {
            Self::General
        }
    }

    fn paragraph(self) -> Option<&'static str> {
        match self {
            Self::AddressForm => Some(
                "Schwerpunkt: Schreibe den Text konsequent in der Du-Ansprache (du/dich/dir/dein) \
                 und entferne alle formellen Anreden (Sie/Ihnen/Ihr). Korrigiere dabei Grammatik \
                 und Zeichensetzung.",
            ),
            Self::Expand => Some(
                "Schwerpunkt: Erweitere den Artikel substanziell, etwa um Zutatenersatz und \
                 Varianten, eine Packliste für Kocher und Topf, Timing und Feuerkontrolle sowie \
                 Troubleshooting. Keine Wiederholungen.",
            ),
            Self::Condense => Some(
                "Schwerpunkt: Kürze präzise. Erhalte Kerninfos, persönliche Note und konkrete \
                 Details, streiche Wiederholungen.",
            ),
            Self::General => None,
        }
    }
}

#[derive(Serialize)]
struct ViolationView {
    label: &'static str,
    observed: String,
    op: &'static str,
    target: String,
}

fn label(criterion: Criterion) -> &'static str {
    match criterion {
        Criterion::Blocklist => "Floskeln aus der Negativliste",
        Criterion::SentenceLengthVariance => "Varianz der Satzlängen",
        Criterion::TypeTokenRatio => "Wortvielfalt (Type-Token-Ratio)",
        Criterion::FirstPersonRatio => "Anteil Ich/Wir-Pronomen",
        Criterion::NumericTokens => "Konkrete Zahlen",
        Criterion::MinWords | Criterion::MaxWords => "Wortanzahl",
        Criterion::SecondPerson => "Du-Ansprache",
        Criterion::FormalAddress => "Förmliche Anrede",
        Criterion::Structure => "Fehlende Strukturelemente",
        Criterion::OpeningFirstPerson => "Ich-Perspektive im Einstieg",
        Criterion::KeywordPlacement => "Keyword in H1 und Einstieg",
        Criterion::SeoTitleLength => "Zeichen im SEO-Titel",
        Criterion::SeoMetaLength => "Zeichen in der Meta-Description",
    }
}

fn defect_phrase(defect: &StructureDefect) -> String {
    match defect {
        StructureDefect::MissingFrontmatter => {
            "YAML-Frontmatter mit seo_title und meta_description".to_string()
        }
        StructureDefect::MissingTitle => "eine H1-Überschrift (# Titel)".to_string(),
        StructureDefect::MissingSection(heading) => format!("die Überschrift „{heading}“"),
        StructureDefect::StepCount(found) => format!(
            "{}–{} nummerierte Schritte (aktuell {found})",
            STEP_RANGE.start(),
            STEP_RANGE.end()
        ),
    }
}

fn goal(violation: &Violation, report: &MetricReport, keyword: Option<&str>) -> String {
    let target = violation.criterion.format_value(violation.threshold);
    match violation.criterion {
        Criterion::Blocklist => {
            let hits: Vec<&str> = report.blocklist_hits.iter().map(String::as_str).collect();
            format!("Entferne diese Floskeln vollständig: {}.", hits.join(", "))
        }
        Criterion::SentenceLengthVariance => {
            "Erhöhe die Satzlängen-Varianz: mische sehr kurze mit deutlich längeren Sätzen."
                .to_string()
        }
        Criterion::TypeTokenRatio => {
            "Formuliere abwechslungsreicher und vermeide Wortwiederholungen.".to_string()
        }
        Criterion::FirstPersonRatio => {
            "Lass die Ich/Wir-Perspektive deutlich sichtbar werden (ich, wir, mein, unser)."
                .to_string()
        }
        Criterion::NumericTokens => {
            let missing = (violation.threshold - violation.observed).max(1.0);
            format!("Füge mindestens {missing:.0} weitere konkrete Zahlen, Zeiten oder Mengen hinzu.")
        }
        Criterion::MinWords => format!("Erweitere den Text auf mindestens {target} Wörter."),
        Criterion::MaxWords => format!("Kürze den Text auf höchstens {target} Wörter."),
        Criterion::SecondPerson => {
            format!("Sprich die Lesenden mindestens {target}-mal direkt mit „du“ an.")
        }
        Criterion::FormalAddress => {
            "Ersetze jede förmliche Anrede (Sie/Ihnen/Ihr) durch die Du-Form.".to_string()
        }
        Criterion::Structure => {
            let missing: Vec<String> = structure_defects(&report.structure)
                .iter()
                .map(defect_phrase)
                .collect();
            format!("Ergänze: {}.", missing.join("; "))
        }
        Criterion::OpeningFirstPerson => format!(
            "Verwende „ich“ schon in den ersten {OPENING_WINDOW} Wörtern, etwa mit einer \
             persönlichen Beobachtung."
        ),
        Criterion::KeywordPlacement => {
            let keyword = keyword.unwrap_or("das Fokus-Keyword");
            format!(
                "Nenne „{keyword}“ in der H1-Überschrift und in den ersten {OPENING_WINDOW} Wörtern."
            )
        }
        Criterion::SeoTitleLength => format!(
            "Passe seo_title auf {}–{} Zeichen an.",
            SEO_TITLE_CHARS.start(),
            SEO_TITLE_CHARS.end()
        ),
        Criterion::SeoMetaLength => format!(
            "Passe meta_description auf {}–{} Zeichen an.",
            META_DESCRIPTION_CHARS.start(),
            META_DESCRIPTION_CHARS.end()
        ),
    }
}

fn layout_phrase(thresholds: &Thresholds) -> Option<String> {
    thresholds.require_structure.then(|| {
        let sections: Vec<String> = crate::metrics::structure::REQUIRED_SECTIONS
            .iter()
            .map(|(marker, name)| format!("{marker} {name}"))
            .collect();
        format!(
            "YAML-Frontmatter (seo_title, meta_description), eine H1, dann {}; {}–{} nummerierte \
             Schritte.",
            sections.join(", "),
            STEP_RANGE.start(),
            STEP_RANGE.end()
        )
    })
}

fn length_phrase(thresholds: &Thresholds) -> Option<String> {
    match (thresholds.min_words, thresholds.max_words) {
        (Some(min), Some(max)) => Some(format!("zwischen {min} und {max} Wörtern")),
        (Some(min), None) => Some(format!("mindestens {min} Wörter")),
        (None, Some(max)) => Some(format!("höchstens {max} Wörter")),
        (None, None) => None,
    }
}

/// Renders the draft, style-edit and corrective prompts from the style guide.
pub struct PromptBuilder {
    engine: TeraEngine,
    style: Arc<StyleGuide>,
    styleguide: String,
    length: Option<String>,
    layout: Option<String>,
}

impl PromptBuilder {
    pub fn new(style: Arc<StyleGuide>, thresholds: &Thresholds) -> Result<Self, PromptError> {
        let mut engine = TeraEngine::new();
        engine.add_template(DRAFT, DRAFT_TEMPLATE)?;
        engine.add_template(EDIT, EDIT_TEMPLATE)?;
        engine.add_template(CORRECTIVE, CORRECTIVE_TEMPLATE)?;

        Ok(Self {
            engine,
            styleguide: style.render(),
            style,
            length: length_phrase(thresholds),
            layout: layout_phrase(thresholds),
        })
    }

    /// System prompt shared by every call.
    pub fn system(&self) -> &str {
        &self.style.persona
    }

    fn base_context(&self) -> Context {
        let mut ctx = Context::new();
        ctx.insert("styleguide", &self.styleguide);
        ctx.insert("length", &self.length);
        ctx.insert("layout", &self.layout);
        ctx
    }

    pub fn draft(
        &self,
        topic: &str,
        details: &str,
        keyword: Option<&str>,
    ) -> Result<String, PromptError> {
        let mut ctx = self.base_context();
        ctx.insert("topic", topic);
        ctx.insert("details", details);
        ctx.insert("keyword", &keyword);
        ctx.insert("opening_window", &OPENING_WINDOW);
        self.engine.render(DRAFT, &ctx)
    }

    pub fn edit(&self, text: &str, instruction: EditInstruction<'_>) -> Result<String, PromptError> {
        let mut ctx = self.base_context();
        ctx.insert("text", text);

        match instruction {
            EditInstruction::Initial => {
                ctx.insert("negative", &self.style.blocklist.joined());
                ctx.insert("examples", &self.style.render_examples());
                self.engine.render(EDIT, &ctx)
            }
            EditInstruction::Corrective {
                verdict,
                report,
                keyword,
            } => {
                let views: Vec<ViolationView> = verdict
                    .violations
                    .iter()
                    .map(|v| ViolationView {
                        label: label(v.criterion),
                        observed: v.criterion.format_value(v.observed),
                        op: if v.exceeds_ceiling() { "≤" } else { "≥" },
                        target: v.criterion.format_value(v.threshold),
                    })
                    .collect();
                let goals: Vec<String> = verdict
                    .violations
                    .iter()
                    .map(|v| goal(v, report, keyword))
                    .collect();

                ctx.insert("violations", &views);
                ctx.insert("goals", &goals);
                ctx.insert("focus", &RepairFocus::from_verdict(verdict).paragraph());
                self.engine.render(CORRECTIVE, &ctx)
            }
        }
    }
}
