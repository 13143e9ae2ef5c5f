use super::*;

mod back_to_top;
mod contact_form;
mod image_modal;
mod nav_menu;
mod reveal;
mod smooth_scroll;

/// Outcome of one behavior's setup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Setup {
    /// Listeners were attached, creating any missing controls.
    Installed,
    /// The behavior's control was already in the markup; nothing was added.
    AlreadyPresent,
    /// An element the behavior depends on is absent.
    Skipped { missing: String },
}

impl Setup {
    fn skipped(capability: &Capability) -> Option<Self> {
        match capability {
            Capability::Present(_) => None,
            Capability::Absent { selector } => Some(Self::Skipped {
                missing: selector.clone(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitReport {
    pub nav_menu: Setup,
    pub contact_form: Setup,
    pub smooth_scroll: Setup,
    pub image_modal: Setup,
    pub reveal: Setup,
    pub back_to_top: Setup,
}

impl InitReport {
    pub fn outcomes(&self) -> [(&'static str, &Setup); 6] {
        [
            ("nav_menu", &self.nav_menu),
            ("contact_form", &self.contact_form),
            ("smooth_scroll", &self.smooth_scroll),
            ("image_modal", &self.image_modal),
            ("reveal", &self.reveal),
            ("back_to_top", &self.back_to_top),
        ]
    }
}

/// Runs the six behavior setups against the current document, in order.
pub fn initialize_app(
    page: &mut Page,
    config: &SiteConfig,
    services: &Services,
) -> Result<InitReport> {
    let report = InitReport {
        nav_menu: nav_menu::setup(page, &config.nav_menu)?,
        contact_form: contact_form::setup(page, &config.contact_form, services)?,
        smooth_scroll: smooth_scroll::setup(page, &config.smooth_scroll)?,
        image_modal: image_modal::setup(page, &config.image_modal, services)?,
        reveal: reveal::setup(page, &config.reveal)?,
        back_to_top: back_to_top::setup(page, &config.back_to_top)?,
    };
    for (name, outcome) in report.outcomes() {
        page.trace_behavior_line(format!("[behavior] setup {name} outcome={outcome:?}"));
    }
    Ok(report)
}

/// Validates `config`, installs the toolkit's dismiss handling and defers
/// [`initialize_app`] to `DOMContentLoaded`. The body is marked loaded on
/// `load`.
pub fn install(page: &mut Page, config: SiteConfig, services: Services) -> Result<()> {
    config.validate()?;
    services.toolkit.install(page)?;

    let document = page.document();
    let loaded_class = config.loaded_class.clone();
    let config = Rc::new(config);
    page.on(document, "DOMContentLoaded", move |page, _| {
        initialize_app(page, &config, &services).map(|_| ())
    });
    page.on(document, "load", move |page, _| mark_loaded(page, &loaded_class));
    Ok(())
}

fn mark_loaded(page: &mut Page, loaded_class: &str) -> Result<()> {
    let Some(body) = page.body() else {
        return Ok(());
    };
    page.node_add_class(body, loaded_class)?;
    page.trace_behavior_line(format!("[behavior] page loaded class={loaded_class}"));
    Ok(())
}

/// Selector matching elements that carry `class_name`.
fn class_selector(class_name: &str) -> String {
    class_name
        .split_whitespace()
        .map(|token| format!(".{token}"))
        .collect()
}

fn escape_text(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn install_defers_setup_until_content_loaded() -> Result<()> {
        let mut page = Page::from_html(
            r#"<body><nav class="navbar"><ul class="nav-list"></ul></nav></body>"#,
        )?;
        install(&mut page, SiteConfig::default(), Services::default())?;
        page.assert_absent(".hamburger")?;
        page.assert_class("body", "loaded", false)?;

        page.finish_loading()?;
        page.assert_exists(".navbar > .hamburger")?;
        page.assert_exists("body > .back-to-top")?;
        page.assert_exists("#imageModal")?;
        page.assert_class("body", "loaded", true)?;
        Ok(())
    }

    #[test]
    fn install_rejects_invalid_config() -> Result<()> {
        let mut page = Page::from_html("<body></body>")?;
        let mut config = SiteConfig::default();
        config.reveal.threshold = -0.5;
        assert!(matches!(
            install(&mut page, config, Services::default()),
            Err(Error::InvalidConfig(_))
        ));
        page.finish_loading()?;
        page.assert_absent(".back-to-top")?;
        Ok(())
    }

    #[test]
    fn report_lists_outcomes_in_setup_order() -> Result<()> {
        let mut page = Page::from_html("<body><button class='back-to-top'>^</button></body>")?;
        let report = initialize_app(&mut page, &SiteConfig::default(), &Services::default())?;
        let names = report.outcomes().map(|(name, _)| name);
        assert_eq!(
            names,
            ["nav_menu", "contact_form", "smooth_scroll", "image_modal", "reveal", "back_to_top"]
        );
        assert_eq!(
            report.nav_menu,
            Setup::Skipped {
                missing: ".navbar".into()
            }
        );
        assert_eq!(report.back_to_top, Setup::AlreadyPresent);
        Ok(())
    }

    #[test]
    fn helpers_build_selectors_and_escape_markup() {
        assert_eq!(class_selector("invalid-feedback"), ".invalid-feedback");
        assert_eq!(class_selector("alert alert-danger"), ".alert.alert-danger");
        assert_eq!(escape_text("<b>&\"x\""), "&lt;b&gt;&amp;&quot;x&quot;");
    }
}
