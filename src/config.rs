use super::*;

/// Selectors, class names, texts and timings for every behavior.
///
/// `Default` matches the markup and copy of the site the behaviors were
/// written for.
#[derive(Debug, Clone, PartialEq)]
pub struct SiteConfig {
    pub nav_menu: NavMenuConfig,
    pub contact_form: ContactFormConfig,
    pub smooth_scroll: SmoothScrollConfig,
    pub image_modal: ImageModalConfig,
    pub reveal: RevealConfig,
    pub back_to_top: BackToTopConfig,
    /// Class added to the body once the page has fully loaded.
    pub loaded_class: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            nav_menu: NavMenuConfig::default(),
            contact_form: ContactFormConfig::default(),
            smooth_scroll: SmoothScrollConfig::default(),
            image_modal: ImageModalConfig::default(),
            reveal: RevealConfig::default(),
            back_to_top: BackToTopConfig::default(),
            loaded_class: "loaded".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NavMenuConfig {
    pub navbar_selector: String,
    pub nav_list_selector: String,
    pub toggle_selector: String,
    pub link_selector: String,
    pub toggle_class: String,
    pub active_class: String,
    pub toggle_label: String,
    pub bar_count: usize,
}

impl Default for NavMenuConfig {
    fn default() -> Self {
        Self {
            navbar_selector: ".navbar".into(),
            nav_list_selector: ".nav-list".into(),
            toggle_selector: ".hamburger".into(),
            link_selector: ".nav-item a".into(),
            toggle_class: "hamburger".into(),
            active_class: "active".into(),
            toggle_label: "Menu de navegação".into(),
            bar_count: 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormMessages {
    pub email_empty: String,
    pub email_malformed: String,
    pub message_empty: String,
    pub message_too_short: String,
    pub sending_label: String,
    pub submit_label: String,
    /// Inner markup of the success banner, including its dismiss button.
    pub success_html: String,
    /// Heading placed before the transport's failure reason.
    pub failure_heading: String,
}

impl Default for FormMessages {
    fn default() -> Self {
        Self {
            email_empty: "Por favor, digite seu email.".into(),
            email_malformed: "Por favor, digite um email válido.".into(),
            message_empty: "Por favor, digite sua mensagem.".into(),
            message_too_short: "A mensagem deve ter pelo menos 10 caracteres.".into(),
            sending_label: "Enviando...".into(),
            submit_label: "Enviar Mensagem".into(),
            success_html: concat!(
                "<strong>Sucesso!</strong> Sua mensagem foi enviada com sucesso. ",
                "Entraremos em contato em breve. ",
                r#"<button type="button" class="btn-close" data-bs-dismiss="alert"></button>"#,
            )
            .into(),
            failure_heading: "Erro!".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContactFormConfig {
    pub form_selector: String,
    pub email_selector: String,
    pub message_selector: String,
    pub submit_selector: String,
    pub submit_class: String,
    pub valid_class: String,
    pub invalid_class: String,
    pub feedback_class: String,
    pub success_banner_class: String,
    pub failure_banner_class: String,
    pub banner_lifetime_ms: i64,
    pub email_pattern: String,
    pub message_min_chars: usize,
    pub messages: FormMessages,
}

impl Default for ContactFormConfig {
    fn default() -> Self {
        Self {
            form_selector: "form.form".into(),
            email_selector: "#exampleFormControlInput1".into(),
            message_selector: "#exampleFormControlTextarea1".into(),
            submit_selector: r#"button[type="submit"]"#.into(),
            submit_class: "btn btn-primary mt-3".into(),
            valid_class: "is-valid".into(),
            invalid_class: "is-invalid".into(),
            feedback_class: "invalid-feedback".into(),
            success_banner_class: "alert alert-success alert-dismissible fade show mt-3".into(),
            failure_banner_class: "alert alert-danger alert-dismissible fade show mt-3".into(),
            banner_lifetime_ms: 5000,
            email_pattern: r"^[^\s@]+@[^\s@]+\.[^\s@]+$".into(),
            message_min_chars: 10,
            messages: FormMessages::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SmoothScrollConfig {
    pub anchor_selector: String,
    pub behavior: ScrollBehavior,
}

impl Default for SmoothScrollConfig {
    fn default() -> Self {
        Self {
            anchor_selector: r##"a[href^="#"]"##.into(),
            behavior: ScrollBehavior::Smooth,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageModalConfig {
    pub modal_id: String,
    pub image_selector: String,
    pub title_selector: String,
    pub modal_image_selector: String,
    pub fallback_title: String,
}

impl Default for ImageModalConfig {
    fn default() -> Self {
        Self {
            modal_id: "imageModal".into(),
            image_selector: ".epita img, .cienc img".into(),
            title_selector: ".modal-title".into(),
            modal_image_selector: ".modal-body img".into(),
            fallback_title: "Imagem".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RevealConfig {
    pub section_selector: String,
    pub reveal_class: String,
    pub threshold: f64,
    pub root_margin: String,
}

impl Default for RevealConfig {
    fn default() -> Self {
        Self {
            section_selector: ".epita, .cienc, .constru".into(),
            reveal_class: "animate-fade-in".into(),
            threshold: 0.1,
            root_margin: "0px 0px -50px 0px".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BackToTopConfig {
    pub control_selector: String,
    pub control_class: String,
    pub label: String,
    pub title: String,
    pub visible_class: String,
    /// Vertical offset that must be exceeded for the control to show.
    pub threshold_px: i64,
    /// When set, visibility is recomputed only after scrolling has been
    /// quiet for this long.
    pub scroll_debounce_ms: Option<i64>,
}

impl Default for BackToTopConfig {
    fn default() -> Self {
        Self {
            control_selector: ".back-to-top".into(),
            control_class: "back-to-top".into(),
            label: "↑".into(),
            title: "Voltar ao topo".into(),
            visible_class: "show".into(),
            threshold_px: 300,
            scroll_debounce_ms: None,
        }
    }
}

impl SiteConfig {
    pub fn validate(&self) -> Result<()> {
        let nav = &self.nav_menu;
        non_empty("nav_menu.navbar_selector", &nav.navbar_selector)?;
        non_empty("nav_menu.nav_list_selector", &nav.nav_list_selector)?;
        non_empty("nav_menu.toggle_selector", &nav.toggle_selector)?;
        non_empty("nav_menu.link_selector", &nav.link_selector)?;
        non_empty("nav_menu.toggle_class", &nav.toggle_class)?;
        non_empty("nav_menu.active_class", &nav.active_class)?;

        let form = &self.contact_form;
        non_empty("contact_form.form_selector", &form.form_selector)?;
        non_empty("contact_form.email_selector", &form.email_selector)?;
        non_empty("contact_form.message_selector", &form.message_selector)?;
        non_empty("contact_form.submit_selector", &form.submit_selector)?;
        non_empty("contact_form.valid_class", &form.valid_class)?;
        non_empty("contact_form.invalid_class", &form.invalid_class)?;
        non_empty("contact_form.feedback_class", &form.feedback_class)?;
        non_negative("contact_form.banner_lifetime_ms", form.banner_lifetime_ms)?;
        if form.message_min_chars == 0 {
            return Err(Error::InvalidConfig(
                "contact_form.message_min_chars must be at least 1".into(),
            ));
        }
        Regex::new(&form.email_pattern).map_err(|err| {
            Error::InvalidConfig(format!("contact_form.email_pattern does not compile: {err}"))
        })?;

        non_empty("smooth_scroll.anchor_selector", &self.smooth_scroll.anchor_selector)?;

        let modal = &self.image_modal;
        non_empty("image_modal.modal_id", &modal.modal_id)?;
        non_empty("image_modal.image_selector", &modal.image_selector)?;
        non_empty("image_modal.title_selector", &modal.title_selector)?;
        non_empty("image_modal.modal_image_selector", &modal.modal_image_selector)?;

        let reveal = &self.reveal;
        non_empty("reveal.section_selector", &reveal.section_selector)?;
        non_empty("reveal.reveal_class", &reveal.reveal_class)?;
        if !(0.0..=1.0).contains(&reveal.threshold) {
            return Err(Error::InvalidConfig(format!(
                "reveal.threshold must be within 0..=1, got {}",
                reveal.threshold
            )));
        }
        RootMargin::parse(&reveal.root_margin)?;

        let back = &self.back_to_top;
        non_empty("back_to_top.control_selector", &back.control_selector)?;
        non_empty("back_to_top.control_class", &back.control_class)?;
        non_empty("back_to_top.visible_class", &back.visible_class)?;
        if let Some(wait) = back.scroll_debounce_ms {
            non_negative("back_to_top.scroll_debounce_ms", wait)?;
        }

        non_empty("loaded_class", &self.loaded_class)
    }
}

fn non_empty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::InvalidConfig(format!("{field} must not be empty")));
    }
    Ok(())
}

fn non_negative(field: &str, value: i64) -> Result<()> {
    if value < 0 {
        return Err(Error::InvalidConfig(format!(
            "{field} must not be negative, got {value}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() -> Result<()> {
        SiteConfig::default().validate()
    }

    #[test]
    fn rejects_out_of_range_values() {
        let mut config = SiteConfig::default();
        config.reveal.threshold = 1.2;
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

        let mut config = SiteConfig::default();
        config.reveal.root_margin = "0px 0px -50% 0px".into();
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

        let mut config = SiteConfig::default();
        config.contact_form.message_min_chars = 0;
        assert!(config.validate().is_err());

        let mut config = SiteConfig::default();
        config.back_to_top.scroll_debounce_ms = Some(-10);
        assert!(config.validate().is_err());

        let mut config = SiteConfig::default();
        config.nav_menu.navbar_selector = "  ".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_uncompilable_email_pattern() {
        let mut config = SiteConfig::default();
        config.contact_form.email_pattern = "[unclosed".into();
        match config.validate() {
            Err(Error::InvalidConfig(message)) => {
                assert!(message.contains("email_pattern"), "unexpected message: {message}")
            }
            other => panic!("expected invalid config, got {other:?}"),
        }
    }
}
