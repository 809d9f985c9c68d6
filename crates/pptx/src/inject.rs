//! Content injection into an instantiated slide.

use crate::placeholder::{self, Capability, PlaceholderRef};
use crate::slide::SlidePart;
use crate::text::{paragraph, paragraph_from_runs, set_paragraphs, Bullets};
use crate::xml::Element;
use deck_core::{
    bullet_indent, parse_inline, DeckInfo, DiagnosticKind, Diagnostics, Result, SlideContent, SlideKind, TextRun,
};

/// Characters stripped from the front of a quote citation.
const CITATION_LEADERS: [char; 4] = ['-', '—', '–', ' '];

/// Injection context for one slide.
pub struct Injector<'a> {
    pub deck: &'a DeckInfo,
    /// 1-based slide number for diagnostics.
    pub slide_number: usize,
    pub diagnostics: &'a mut Diagnostics,
}

impl<'a> Injector<'a> {
    /// Write `content` into the slide's placeholders according to `kind`.
    pub fn inject(&mut self, slide: &mut SlidePart, content: &SlideContent, kind: SlideKind) -> Result<()> {
        let tree = slide.sp_tree_mut()?;
        match kind {
            SlideKind::Title => self.inject_title_slide(tree),
            SlideKind::Quote => self.inject_quote(tree, content),
            SlideKind::Closing => self.inject_closing(tree, content),
            SlideKind::TextOnly => self.inject_text_only(tree, content),
            SlideKind::PhotoCentered | SlideKind::DefaultBullets => self.inject_bullets(tree, content),
        }
        Ok(())
    }

    fn missing(&mut self, what: &str) {
        self.diagnostics.record(
            Some(self.slide_number),
            DiagnosticKind::MissingPlaceholder,
            format!("no {} placeholder; {} skipped", what, what),
        );
    }

    /// Fill the target with paragraphs, recording a diagnostic when absent.
    fn fill(&mut self, tree: &mut Element, target: Option<PlaceholderRef>, what: &str, paragraphs: Vec<Element>) {
        match target.and_then(|t| placeholder::shape_at_mut(tree, &t)) {
            Some(shape) => set_paragraphs(shape, paragraphs),
            None => self.missing(what),
        }
    }

    fn inject_headline(&mut self, tree: &mut Element, headline: &str) {
        if headline.trim().is_empty() {
            return;
        }
        let target = placeholder::find_title(tree);
        self.fill(tree, target, "title", vec![paragraph(headline, Bullets::Level(0))]);
    }

    fn inject_title_slide(&mut self, tree: &mut Element) {
        let targets = placeholder::title_slide_targets(tree);
        if targets.len() < 3 {
            let title = targets.into_iter().find(|t| t.capability == Capability::Title);
            let course = self.deck.course_title.clone();
            if !course.trim().is_empty() {
                self.fill(tree, title, "title", vec![paragraph(&course, Bullets::Level(0))]);
            }
            return;
        }

        let values = [&self.deck.course_title, &self.deck.week, &self.deck.date];
        for (target, value) in targets.iter().zip(values) {
            if value.trim().is_empty() {
                continue;
            }
            if let Some(shape) = placeholder::shape_at_mut(tree, target) {
                set_paragraphs(shape, vec![paragraph(value, Bullets::Level(0))]);
            }
        }
    }

    fn inject_quote(&mut self, tree: &mut Element, content: &SlideContent) {
        if content.quote.trim().is_empty() {
            return;
        }
        let mut paragraphs = vec![paragraph(&content.quote, Bullets::HiddenFlush)];
        let citation = content.quote_citation.trim_start_matches(CITATION_LEADERS).trim();
        if !citation.is_empty() {
            let mut runs = vec![TextRun::plain("— ")];
            runs.extend(parse_inline(citation));
            paragraphs.push(paragraph_from_runs(&runs, Bullets::HiddenFlush, true));
        }
        let target = placeholder::find_quote_body(tree);
        self.fill(tree, target, "quote", paragraphs);
    }

    fn inject_closing(&mut self, tree: &mut Element, content: &SlideContent) {
        let mut lines = content.headline.lines();
        if let Some(first) = lines.next() {
            self.inject_headline(tree, first);
        }

        let mut paragraphs: Vec<Element> = lines
            .filter(|l| !l.trim().is_empty())
            .map(|l| paragraph(l, Bullets::Hidden))
            .collect();
        if !content.paragraph.trim().is_empty() {
            paragraphs.push(paragraph(&content.paragraph, Bullets::Hidden));
        }
        if !paragraphs.is_empty() {
            let target = placeholder::find_body(tree);
            self.fill(tree, target, "body", paragraphs);
        }
    }

    fn inject_text_only(&mut self, tree: &mut Element, content: &SlideContent) {
        if !content.hide_headline {
            self.inject_headline(tree, &content.headline);
        }
        if content.paragraph.trim().is_empty() {
            return;
        }
        let paragraphs = content
            .paragraph
            .split('\n')
            .map(|line| paragraph(line.trim_end_matches('\r'), Bullets::Hidden))
            .collect();
        let target = placeholder::find_body(tree);
        self.fill(tree, target, "body", paragraphs);
    }

    fn inject_bullets(&mut self, tree: &mut Element, content: &SlideContent) {
        if !content.hide_headline {
            self.inject_headline(tree, &content.headline);
        }

        let mut paragraphs = Vec::new();
        if !content.paragraph.trim().is_empty() {
            paragraphs.push(paragraph(&content.paragraph, Bullets::Hidden));
        }
        for bullet in content.bullets.iter().filter(|b| !b.trim().is_empty()) {
            let (level, text) = bullet_indent(bullet);
            paragraphs.push(paragraph(&text, Bullets::Level(level)));
        }
        if !paragraphs.is_empty() {
            let target = placeholder::find_body(tree);
            self.fill(tree, target, "body", paragraphs);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slide::add_slide;
    use crate::template::Template;
    use crate::testutil;

    fn slide_for(layout: &str) -> (Template, SlidePart) {
        let mut diagnostics = Diagnostics::new();
        let mut template = Template::from_package(testutil::template_package(), &mut diagnostics).unwrap();
        let handle = template.catalog().get(layout).unwrap().clone();
        let slide = add_slide(template.package_mut(), &handle).unwrap();
        (template, slide)
    }

    fn inject(slide: &mut SlidePart, content: &SlideContent, deck: &DeckInfo) -> Diagnostics {
        let mut diagnostics = Diagnostics::new();
        let mut injector = Injector {
            deck,
            slide_number: 1,
            diagnostics: &mut diagnostics,
        };
        injector
            .inject(slide, content, SlideKind::classify(content))
            .unwrap();
        diagnostics
    }

    fn body_paragraphs(slide: &SlidePart) -> Vec<Element> {
        let tree = slide.sp_tree().unwrap();
        let body = placeholder::find_body(tree).unwrap();
        placeholder::shape_at(tree, &body)
            .unwrap()
            .descendants("p")
            .into_iter()
            .cloned()
            .collect()
    }

    #[test]
    fn test_bullet_levels_and_text() {
        let (_template, mut slide) = slide_for("White_Bullets");
        let mut content = SlideContent::new("bullets");
        content.headline = "Agenda".to_string();
        content.bullets = vec!["First".into(), "--Second".into(), "Third".into()];
        let diagnostics = inject(&mut slide, &content, &DeckInfo::default());
        assert!(diagnostics.is_empty());

        let paras = body_paragraphs(&slide);
        let texts: Vec<String> = paras.iter().map(|p| p.text()).collect();
        assert_eq!(texts, vec!["First", "Second", "Third"]);
        let levels: Vec<Option<&str>> = paras
            .iter()
            .map(|p| p.find(&["pPr"]).and_then(|ppr| ppr.attr("lvl")))
            .collect();
        assert_eq!(levels, vec![None, Some("1"), None]);

        let tree = slide.sp_tree().unwrap();
        let title = placeholder::find_title(tree).unwrap();
        assert_eq!(placeholder::shape_at(tree, &title).unwrap().text(), "Agenda");
    }

    #[test]
    fn test_paragraph_precedes_bullets_without_bullet() {
        let (_template, mut slide) = slide_for("White_Bullets");
        let mut content = SlideContent::new("bullets");
        content.paragraph = "Intro".to_string();
        content.bullets = vec!["Point".into()];
        inject(&mut slide, &content, &DeckInfo::default());

        let paras = body_paragraphs(&slide);
        assert_eq!(paras[0].text(), "Intro");
        assert!(paras[0].find(&["pPr", "buNone"]).is_some());
        assert!(paras[1].find(&["pPr", "buNone"]).is_none());
    }

    #[test]
    fn test_hide_headline_leaves_title_empty() {
        let (_template, mut slide) = slide_for("White_Bullets");
        let mut content = SlideContent::new("bullets");
        content.headline = "Hidden".to_string();
        content.hide_headline = true;
        inject(&mut slide, &content, &DeckInfo::default());

        let tree = slide.sp_tree().unwrap();
        let title = placeholder::find_title(tree).unwrap();
        assert_eq!(placeholder::shape_at(tree, &title).unwrap().text(), "");
    }

    #[test]
    fn test_title_slide_fills_three_placeholders() {
        let (_template, mut slide) = slide_for("Arches_Title");
        let mut content = SlideContent::new("title");
        content.is_title = true;
        let deck = DeckInfo {
            course_title: "Journalism Innovation".into(),
            week: "Week 3".into(),
            date: "Sept 15".into(),
        };
        inject(&mut slide, &content, &deck);

        let tree = slide.sp_tree().unwrap();
        let texts: Vec<String> = placeholder::title_slide_targets(tree)
            .iter()
            .map(|t| placeholder::shape_at(tree, t).unwrap().text())
            .collect();
        assert_eq!(texts, vec!["Journalism Innovation", "Week 3", "Sept 15"]);
    }

    #[test]
    fn test_title_slide_with_two_placeholders_sets_title_only() {
        let (_template, mut slide) = slide_for("White_Bullets");
        let mut content = SlideContent::new("title");
        content.is_title = true;
        let deck = DeckInfo {
            course_title: "Course".into(),
            week: "Week 1".into(),
            date: "Today".into(),
        };
        inject(&mut slide, &content, &deck);

        let tree = slide.sp_tree().unwrap();
        let title = placeholder::find_title(tree).unwrap();
        assert_eq!(placeholder::shape_at(tree, &title).unwrap().text(), "Course");
        assert_eq!(body_paragraphs(&slide).iter().map(|p| p.text()).collect::<String>(), "");
    }

    #[test]
    fn test_quote_with_citation() {
        let (_template, mut slide) = slide_for("White_Quote");
        let mut content = SlideContent::new("quote");
        content.quote = "Stay hungry".to_string();
        content.quote_citation = "- Jobs".to_string();
        inject(&mut slide, &content, &DeckInfo::default());

        let tree = slide.sp_tree().unwrap();
        let target = placeholder::find_quote_body(tree).unwrap();
        let paras: Vec<&Element> = placeholder::shape_at(tree, &target).unwrap().descendants("p");
        assert_eq!(paras.len(), 2);
        assert_eq!(paras[0].text(), "Stay hungry");
        let ppr = paras[0].child("pPr").unwrap();
        assert_eq!(ppr.attr("marL"), Some("0"));
        assert!(ppr.child("buNone").is_some());
        assert_eq!(paras[1].text(), "— Jobs");
        assert!(paras[1]
            .descendants("rPr")
            .iter()
            .all(|r| r.attr("i") == Some("1")));
    }

    #[test]
    fn test_closing_splits_headline() {
        let (_template, mut slide) = slide_for("White_Closing");
        let mut content = SlideContent::new("closing");
        content.headline = "Thanks\nQuestions?".to_string();
        content.paragraph = "see you".to_string();
        inject(&mut slide, &content, &DeckInfo::default());

        let tree = slide.sp_tree().unwrap();
        let title = placeholder::find_title(tree).unwrap();
        assert_eq!(placeholder::shape_at(tree, &title).unwrap().text(), "Thanks");
        let texts: Vec<String> = body_paragraphs(&slide).iter().map(|p| p.text()).collect();
        assert_eq!(texts, vec!["Questions?", "see you"]);
    }

    #[test]
    fn test_text_only_keeps_blank_lines() {
        let (_template, mut slide) = slide_for("White_Lines");
        let mut content = SlideContent::new("lines");
        content.paragraph = "one\n\nthree".to_string();
        content.bullets = vec!["ignored".into()];
        inject(&mut slide, &content, &DeckInfo::default());

        let paras = body_paragraphs(&slide);
        let texts: Vec<String> = paras.iter().map(|p| p.text()).collect();
        assert_eq!(texts, vec!["one", "", "three"]);
        assert!(paras.iter().all(|p| p.find(&["pPr", "buNone"]).is_some()));
    }

    #[test]
    fn test_missing_body_is_diagnosed() {
        let (_template, mut slide) = slide_for("Title_Only");
        let mut content = SlideContent::new("bullets");
        content.bullets = vec!["orphan".into()];
        let diagnostics = inject(&mut slide, &content, &DeckInfo::default());
        assert!(diagnostics.has(DiagnosticKind::MissingPlaceholder));
    }
}
