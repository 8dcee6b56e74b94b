//! Built-in site catalog.
//!
//! Each entry transcribes one production signup flow into step data.
//! Selector choices mirror what the live pages expose today; when a site
//! redesigns, only this file changes. CAPTCHA widgets get optional click
//! steps with short timeouts — we attempt the known targets and give up.

use super::{InteractionStep, SiteAdapter, Target};

/// All built-in adapters, in routing-priority order.
pub fn all() -> Vec<SiteAdapter> {
    vec![
        cnn(),
        fox_news(),
        the_atlantic(),
        the_verge(),
        vox(),
        ap_news(),
        national_review(),
        axios(),
        pennlive(),
        the_guardian(),
        techcrunch(),
        quartz(),
    ]
}

fn cnn() -> SiteAdapter {
    SiteAdapter {
        name: "CNN",
        homepage: "https://edition.cnn.com/newsletters",
        domain_patterns: &["cnn.com", "edition.cnn.com"],
        steps: vec![
            // Interstitial "start" link; present only on some variants.
            InteractionStep::click(vec![Target::css("body > div:nth-child(3) > div > a")])
                .optional()
                .timeout_ms(5_000)
                .settle_ms(1_000),
            InteractionStep::click(vec![
                Target::css("#newsletter-0 button"),
                Target::css("#newsletter-0 [role='button']"),
            ])
            .optional()
            .timeout_ms(10_000)
            .settle_ms(500),
            InteractionStep::click(vec![Target::css("#newsletter-1 button")])
                .optional()
                .timeout_ms(5_000)
                .settle_ms(500),
            InteractionStep::fill_email(vec![
                Target::textbox("Email address"),
                Target::css("input[type='email']"),
            ]),
            InteractionStep::click(vec![
                Target::button_exact("Sign Up"),
                Target::css("button[type='submit']"),
            ])
            .retries(2)
            .settle_ms(3_000),
            // Arkose puzzle lives in a cross-origin iframe; these targets
            // rarely resolve, which is exactly the give-up behavior we want.
            InteractionStep::click(vec![
                Target::button("Start Puzzle"),
                Target::css("iframe[title='Verification challenge']"),
            ])
            .optional()
            .timeout_ms(8_000)
            .settle_ms(3_000),
            InteractionStep::wait_ms(5_000),
        ],
    }
}

fn fox_news() -> SiteAdapter {
    SiteAdapter {
        name: "Fox News",
        homepage: "https://www.foxnews.com/newsletters",
        domain_patterns: &["foxnews.com", "fox.com"],
        steps: vec![
            InteractionStep::click(vec![Target::css("div.button.enter a")])
                .optional()
                .timeout_ms(10_000),
            InteractionStep::fill_email(vec![
                Target::css("input[type='email']"),
                Target::textbox("Email"),
            ]),
            InteractionStep::click(vec![
                Target::css("div.button.enter a"),
                Target::button("Subscribe"),
                Target::css("button[type='submit']"),
            ])
            .retries(2),
            InteractionStep::wait_ms(3_000),
        ],
    }
}

fn the_atlantic() -> SiteAdapter {
    SiteAdapter {
        name: "The Atlantic",
        homepage: "https://www.theatlantic.com/newsletters/",
        domain_patterns: &["theatlantic.com"],
        steps: vec![
            InteractionStep::click(vec![
                Target::css("[data-testid='newsletter-card'] button"),
                Target::css("li article button"),
            ])
            .optional()
            .timeout_ms(10_000),
            InteractionStep::fill_email(vec![
                Target::textbox("Email Address"),
                Target::css("input[type='email']"),
            ])
            .settle_ms(3_000),
            InteractionStep::click(vec![
                Target::button("Sign Up"),
                Target::css("button[type='submit']"),
            ])
            .settle_ms(3_000),
            InteractionStep::wait_ms(5_000),
        ],
    }
}

fn the_verge() -> SiteAdapter {
    SiteAdapter {
        name: "The Verge",
        homepage: "https://www.theverge.com/newsletters",
        domain_patterns: &["theverge.com"],
        steps: vec![
            InteractionStep::click(vec![Target::css_nth("#free-newsletters label", 0)])
                .settle_ms(3_000),
            InteractionStep::click(vec![Target::css_nth("#free-newsletters label", 1)])
                .optional()
                .timeout_ms(5_000)
                .settle_ms(3_000),
            InteractionStep::fill_email(vec![
                Target::textbox("Enter your email"),
                Target::css("input[type='email']"),
            ])
            .settle_ms(3_000),
            InteractionStep::click(vec![
                Target::button("Sign Up"),
                Target::css("button[type='submit']"),
            ])
            .settle_ms(3_000),
            InteractionStep::wait_ms(5_000),
        ],
    }
}

fn vox() -> SiteAdapter {
    SiteAdapter {
        name: "Vox",
        homepage: "https://www.vox.com/newsletters",
        domain_patterns: &["vox.com"],
        steps: vec![
            InteractionStep::click(vec![Target::css_nth("#start-here label", 0)])
                .settle_ms(3_000),
            InteractionStep::click(vec![Target::css_nth("#start-here label", 1)])
                .optional()
                .timeout_ms(5_000)
                .settle_ms(3_000),
            InteractionStep::click(vec![Target::css_nth("#start-here label", 2)])
                .optional()
                .timeout_ms(5_000)
                .settle_ms(3_000),
            InteractionStep::click(vec![Target::css_nth("#politics-and-policy label", 0)])
                .optional()
                .timeout_ms(5_000)
                .settle_ms(3_000),
            InteractionStep::click(vec![Target::css_nth("#future-perfect label", 0)])
                .optional()
                .timeout_ms(5_000)
                .settle_ms(3_000),
            InteractionStep::click(vec![Target::css_nth("#culture-and-technology label", 0)])
                .optional()
                .timeout_ms(5_000)
                .settle_ms(3_000),
            InteractionStep::fill_email(vec![
                Target::textbox("Enter your email"),
                Target::css("input[type='email']"),
            ])
            .settle_ms(3_000),
            InteractionStep::click(vec![
                Target::css("#content form fieldset button"),
                Target::button("Sign Up"),
            ])
            .settle_ms(3_000),
            InteractionStep::wait_ms(5_000),
        ],
    }
}

fn ap_news() -> SiteAdapter {
    SiteAdapter {
        name: "AP News",
        homepage: "https://apnews.com/newsletters",
        domain_patterns: &["apnews.com"],
        steps: vec![
            InteractionStep::click(vec![Target::css(".checkbox-label")])
                .optional()
                .timeout_ms(10_000),
            InteractionStep::click(vec![Target::css_nth(
                ".NewsletterItem .checkbox-label",
                1,
            )])
            .optional()
            .timeout_ms(5_000),
            InteractionStep::click(vec![Target::css_nth(
                ".NewsletterItem .checkbox-label",
                2,
            )])
            .optional()
            .timeout_ms(5_000),
            InteractionStep::click(vec![Target::button_exact("SELECT")])
                .optional()
                .timeout_ms(5_000)
                .settle_ms(500),
            InteractionStep::fill_email(vec![
                Target::textbox("Share your email here"),
                Target::css("input[type='email']"),
            ])
            .settle_ms(500),
            InteractionStep::check(vec![
                Target::css(".Disclaimer input[type='checkbox']"),
                Target::checkbox("disclaimer"),
            ])
            .optional()
            .timeout_ms(5_000),
            InteractionStep::click(vec![
                Target::button("Sign Up"),
                Target::css("button[type='submit']"),
            ])
            .settle_ms(2_000),
            InteractionStep::wait_ms(3_000),
        ],
    }
}

fn national_review() -> SiteAdapter {
    SiteAdapter {
        name: "National Review",
        homepage: "https://link.nationalreview.com/join/4rc/newdesign-nls-signup",
        domain_patterns: &["nationalreview.com"],
        steps: vec![
            InteractionStep::click(vec![Target::css("div:nth-child(4) > .checkbox > .checkmark")])
                .optional()
                .timeout_ms(10_000),
            InteractionStep::fill_email(vec![
                Target::textbox("Email Address"),
                Target::css("input[type='email']"),
            ]),
            InteractionStep::click(vec![
                Target::button_exact("SIGN UP"),
                Target::css("button[type='submit']"),
            ])
            .settle_ms(2_000),
            InteractionStep::wait_ms(5_000),
        ],
    }
}

fn axios() -> SiteAdapter {
    SiteAdapter {
        name: "Axios",
        homepage: "https://www.axios.com/newsletters",
        domain_patterns: &["axios.com"],
        // Signup flow not scripted yet; the page is visited and left to
        // settle so a manual headful run can finish the interaction.
        steps: vec![InteractionStep::wait_ms(5_000)],
    }
}

fn pennlive() -> SiteAdapter {
    SiteAdapter {
        name: "PennLive",
        homepage: "https://link.pennlive.com/join/6fl/signup",
        domain_patterns: &["pennlive.com"],
        steps: vec![
            InteractionStep::click(vec![Target::css(".checkbox > .checkmark")])
                .optional()
                .timeout_ms(10_000),
            InteractionStep::fill_email(vec![
                Target::textbox("Email"),
                Target::css("input[type='email']"),
            ]),
            InteractionStep::click(vec![
                Target::css("input#form-submit[type='submit']"),
                Target::button("Sign Up"),
            ])
            .settle_ms(3_000),
            InteractionStep::wait_ms(5_000),
        ],
    }
}

fn the_guardian() -> SiteAdapter {
    SiteAdapter {
        name: "The Guardian",
        homepage: "https://www.theguardian.com/email-newsletters",
        domain_patterns: &["theguardian.com"],
        steps: vec![
            // A representative slice of the add-newsletter buttons; every
            // one is optional since the lineup rotates weekly.
            InteractionStep::click(vec![Target::button("add First Thing to subscribe")])
                .optional()
                .timeout_ms(8_000)
                .settle_ms(3_000),
            InteractionStep::click(vec![Target::button("add TechScape to subscribe")])
                .optional()
                .timeout_ms(8_000)
                .settle_ms(3_000),
            InteractionStep::click(vec![Target::button("add Down to Earth to")])
                .optional()
                .timeout_ms(8_000)
                .settle_ms(3_000),
            InteractionStep::click(vec![Target::button("add The Long Read to")])
                .optional()
                .timeout_ms(8_000)
                .settle_ms(3_000),
            InteractionStep::fill_email(vec![
                Target::textbox("Enter your email"),
                Target::css("input[type='email']"),
            ])
            .settle_ms(3_000),
            InteractionStep::check(vec![Target::checkbox("Get updates about our")])
                .optional()
                .timeout_ms(8_000)
                .settle_ms(3_000),
            // reCAPTCHA checkbox sits in a cross-origin iframe.
            InteractionStep::click(vec![Target::checkbox("I'm not a robot")])
                .optional()
                .timeout_ms(8_000)
                .settle_ms(3_000),
            InteractionStep::click(vec![
                Target::css_nth("div:nth-child(13) > div", 0),
                Target::button("Subscribe"),
            ])
            .optional()
            .timeout_ms(8_000)
            .settle_ms(3_000),
            InteractionStep::wait_ms(5_000),
        ],
    }
}

fn techcrunch() -> SiteAdapter {
    SiteAdapter {
        name: "TechCrunch",
        homepage: "https://techcrunch.com/newsletters/",
        domain_patterns: &["techcrunch.com"],
        steps: vec![
            InteractionStep::click(vec![Target::button_exact("Select All")]),
            InteractionStep::fill_email(vec![
                Target::textbox("Email address"),
                Target::css("input[type='email']"),
            ]),
            InteractionStep::scroll(vec![Target::css("main form fieldset button")])
                .optional()
                .timeout_ms(5_000)
                .settle_ms(500),
            InteractionStep::click(vec![
                Target::css("main form fieldset button"),
                Target::button("Subscribe"),
            ])
            .retries(2)
            .settle_ms(3_000),
            InteractionStep::wait_ms(5_000),
        ],
    }
}

fn quartz() -> SiteAdapter {
    SiteAdapter {
        name: "Quartz",
        homepage: "https://qz.com/newsletter",
        domain_patterns: &["qz.com"],
        steps: vec![
            InteractionStep::fill_email(vec![
                Target::textbox("Enter email here"),
                Target::css("input[type='email']"),
            ]),
            InteractionStep::scroll(vec![Target::button("Sign me up")])
                .optional()
                .timeout_ms(5_000)
                .settle_ms(500),
            InteractionStep::click(vec![
                Target::button("Sign me up"),
                Target::css("button[type='submit']"),
            ])
            .settle_ms(3_000),
            InteractionStep::wait_ms(5_000),
        ],
    }
}
