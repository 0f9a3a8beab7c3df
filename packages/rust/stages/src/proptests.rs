use pagepatch_shared::{
    AnchorConfig, BlockKind, ClassLabelStageConfig, ContentBlock, ContentKey, DateStageConfig,
    DateStagger, DatesConfig, ElementStageConfig, ImportStageConfig, Placement,
    SectionStageConfig, SectionStyle,
};
use proptest::prelude::*;

use crate::{
    ClassLabelStage, DateStage, ElementStage, ImportStage, PatchStage, SectionStage, StageContext,
};

/// Pieces a page source is assembled from.
const PIECES: &[&str] = &[
    "import React from \"react\";\n",
    "import PublicHeader from \"../components/PublicHeader.jsx\";\n",
    "import PublicFooter from \"../components/PublicFooter.jsx\";\n",
    "export default function Page() {\n  return (\n",
    "    <div className=\"mx-auto max-w-4xl px-6 py-16\">\n",
    "    <main className=\"mx-auto w-full max-w-7xl px-8 py-16\">\n",
    "      <h1>Coursier</h1>\n",
    "      <p>Publié le 12/12/2025</p>\n",
    "      <time dateTime=\"2025-12-12\">12/12/2025</time>\n",
    "      <PublicFooter />\n",
    "    </main>\n",
    "    </div>\n  );\n",
    "}\n",
    "<main></main>",
    "</main>",
    "Publié le ",
    "2025-01-01",
    "className=\"",
    "\n",
    "  ",
];

fn page() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(PIECES.to_vec()), 0..16)
        .prop_map(|parts| parts.concat())
}

fn stages() -> Vec<Box<dyn PatchStage>> {
    let dates = DatesConfig::default();
    vec![
        Box::new(
            ImportStage::new(&ImportStageConfig {
                id: "footer-import".into(),
                binding: "PublicFooter".into(),
                from: "../components/PublicFooter.jsx".into(),
                after: Some("PublicHeader".into()),
                documents: None,
            })
            .unwrap(),
        ),
        Box::new(
            ElementStage::new(&ElementStageConfig {
                id: "footer-element".into(),
                element: "<PublicFooter />".into(),
                marker: None,
                anchors: vec![
                    AnchorConfig {
                        pattern: "</main>".into(),
                        placement: Placement::After,
                    },
                    AnchorConfig {
                        pattern: "</div>\n  );".into(),
                        placement: Placement::Before,
                    },
                ],
                documents: None,
            })
            .unwrap(),
        ),
        Box::new(
            ClassLabelStage::new(&ClassLabelStageConfig {
                id: "blog-style".into(),
                attribute: "className".into(),
                legacy: vec![
                    "mx-auto max-w-4xl px-6 py-16".into(),
                    "mx-auto max-w-3xl px-6 py-16".into(),
                    "mx-auto w-full max-w-7xl px-8 py-16".into(),
                ],
                canonical: "blog-page".into(),
                documents: None,
            })
            .unwrap(),
        ),
        Box::new(
            SectionStage::new(&SectionStageConfig {
                id: "seo-why".into(),
                slot: "why".into(),
                marker: None,
                anchor: "</main>".into(),
                trailing: vec![],
                style: SectionStyle::default(),
                documents: None,
            })
            .unwrap(),
        ),
        Box::new(
            DateStage::new(
                &DateStageConfig {
                    id: "stagger-dates".into(),
                    documents: None,
                },
                &dates,
            )
            .unwrap(),
        ),
    ]
}

fn run_all(stages: &[Box<dyn PatchStage>], text: &str, ctx: &StageContext<'_>) -> String {
    stages.iter().fold(text.to_string(), |acc, stage| {
        stage.apply(&acc, ctx).text.unwrap_or(acc)
    })
}

proptest! {
    #[test]
    fn full_stage_list_is_idempotent(text in page(), index in 0usize..15) {
        let stagger = DateStagger::from_config(&DatesConfig::default()).unwrap();
        let date = stagger.render(&stagger.assign(index).unwrap());
        let key = ContentKey::new("B2B Paris");
        let blocks = vec![ContentBlock {
            slot: "why".into(),
            kind: BlockKind::Bullets,
            heading: Some("Pourquoi choisir One Connexion ?".into()),
            fragments: vec!["Délais courts.".into(), "POD numérique.".into()],
            outro: None,
        }];
        let ctx = StageContext {
            document: "CoursierB2BParis",
            content_key: Some(&key),
            content: Some(blocks.as_slice()),
            date: Some(&date),
        };

        let stages = stages();
        let once = run_all(&stages, &text, &ctx);
        let twice = run_all(&stages, &once, &ctx);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn each_stage_is_idempotent_on_arbitrary_text(text in ".{0,400}") {
        let stagger = DateStagger::from_config(&DatesConfig::default()).unwrap();
        let date = stagger.render(&stagger.assign(3).unwrap());
        let ctx = StageContext {
            document: "About",
            date: Some(&date),
            ..StageContext::default()
        };

        for stage in stages() {
            let once = stage.apply(&text, &ctx).text.unwrap_or_else(|| text.clone());
            let twice = stage.apply(&once, &ctx).text.unwrap_or_else(|| once.clone());
            prop_assert_eq!(&once, &twice, "stage {}", stage.id());
        }
    }

    #[test]
    fn marker_stages_never_touch_marked_text(text in page()) {
        for stage in stages() {
            if stage.always_runs() || !stage.already_applied(&text) {
                continue;
            }
            prop_assert!(stage.apply(&text, &StageContext::default()).text.is_none());
        }
    }
}
