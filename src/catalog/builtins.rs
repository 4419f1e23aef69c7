//! Built-in incident scenarios.

use std::collections::BTreeMap;

use super::record::{ChartPoint, RecordPayload, SourceRecord};
use super::types::{
    ConfidenceLevel, HypothesisRule, IntroScript, Scenario, ScenarioDefinition, SourceProfile,
};
use super::SourceKey;

fn profile(
    source: SourceKey,
    evidence: &str,
    check: &str,
    interpretation: &str,
) -> SourceProfile {
    SourceProfile {
        source,
        evidence: evidence.to_string(),
        check: check.to_string(),
        interpretation: interpretation.to_string(),
        evidence_id: 0,
    }
}

fn rule(
    requires: &[SourceKey],
    level: ConfidenceLevel,
    percent: u8,
    conclusion: &str,
    note: Option<&str>,
    correlation: &str,
) -> HypothesisRule {
    HypothesisRule {
        requires: requires.to_vec(),
        conclusion: conclusion.to_string(),
        level,
        percent,
        note: note.map(str::to_string),
        correlation: correlation.to_string(),
    }
}

fn chart(points: &[(&str, f64)]) -> RecordPayload {
    RecordPayload::Chart {
        points: points
            .iter()
            .map(|(label, value)| ChartPoint::new(*label, *value))
            .collect(),
    }
}

fn list(items: &[&str]) -> RecordPayload {
    RecordPayload::List {
        items: items.iter().map(|s| s.to_string()).collect(),
    }
}

fn text(content: &str) -> RecordPayload {
    RecordPayload::Text {
        content: content.to_string(),
    }
}

fn keywords(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}

/// Checkout completion drop on May 5th.
///
/// Relevant sources: analytics, support, releases.
pub fn checkout_drop() -> ScenarioDefinition {
    use SourceKey::{Analytics, Internal, Releases, Support};

    ScenarioDefinition {
        scenario: Scenario {
            key: "checkout-drop".to_string(),
            title: "Checkout Completion Drop (May 5th)".to_string(),
            query: "Why did checkout completion drop on May 5th?".to_string(),
            description: "Investigate the sudden decrease in checkout completion rate that started on May 5th.".to_string(),
        },
        keywords: keywords(&["checkout", "conversion", "purchase", "cart"]),
        sources: vec![
            profile(
                Analytics,
                "Checkout completion rate dropped from 85% to 70% at 14:00 on May 5th.",
                "Looking for changes in checkout completion rate around May 5th",
                "The drop is sharp and starts mid-afternoon, which points to a discrete event rather than a gradual decline.",
            ),
            profile(
                Support,
                "Multiple support tickets reported checkout button not responding on mobile devices.",
                "Looking for support tickets mentioning checkout problems",
                "Tickets cluster on mobile devices and describe an unresponsive button, which suggests a client-side defect.",
            ),
            profile(
                Releases,
                "Release v2.5.1 deployed at 13:45 on May 5th included changes to mobile checkout UI.",
                "Looking for deployments shortly before the drop",
                "v2.5.1 changed the mobile checkout button 15 minutes before completion started falling.",
            ),
        ],
        intro: IntroScript {
            parse: "Detected key terms: \"checkout completion\", \"drop\", \"May 5th\"".to_string(),
            identify: "KPI: Checkout completion rate".to_string(),
            determine: "Time window: May 5th, compared against May 3rd-4th as baseline".to_string(),
            thought: "A sudden drop in a conversion KPI usually means a product change or a user-facing defect. I'll confirm the drop in analytics, then look for user reports and recent deployments.".to_string(),
        },
        rules: vec![
            rule(
                &[Analytics, Support, Releases],
                ConfidenceLevel::High,
                90,
                "Release v2.5.1 caused checkout button failure on mobile devices due to event handler changes.",
                None,
                "The 14:00 drop lines up with the v2.5.1 rollout completing and with mobile tickets about an unresponsive checkout button.",
            ),
            rule(
                &[Analytics, Support],
                ConfidenceLevel::Medium,
                65,
                "A recent code change likely caused checkout button failures on mobile devices.",
                Some("Release data missing for confirmation."),
                "The drop coincides with a burst of mobile checkout tickets, but without release data the trigger cannot be pinned down.",
            ),
            rule(
                &[Analytics, Releases],
                ConfidenceLevel::Medium,
                60,
                "Release v2.5.1 coincides with checkout completion drop.",
                Some("Support ticket data missing for user impact details."),
                "The drop follows the v2.5.1 deployment, but without support tickets the user-facing symptom is unknown.",
            ),
            rule(
                &[Analytics],
                ConfidenceLevel::Low,
                30,
                "Checkout completion dropped 15% on May 5th afternoon due to unknown causes.",
                Some("Insufficient data to determine root cause."),
                "Only the checkout metric is available, so the drop cannot be correlated with any cause.",
            ),
        ],
        fallback: rule(
            &[],
            ConfidenceLevel::VeryLow,
            20,
            "Insufficient data to determine root cause of checkout completion drop.",
            Some("Critical data sources are missing from analysis."),
            "Not enough relevant sources are active to correlate the checkout drop with a cause.",
        ),
        records: BTreeMap::from([
            (
                Analytics,
                vec![SourceRecord::new(
                    "Checkout completion dropped 15% starting at 14:00 on May 5th.",
                    "Analytics Data - Checkout Completion Rate",
                    "Daily checkout completion rate from May 3rd to May 7th",
                    chart(&[
                        ("May 3", 84.0),
                        ("May 4", 86.0),
                        ("May 5 (AM)", 85.0),
                        ("May 5 (PM)", 70.0),
                        ("May 6", 71.0),
                        ("May 7", 72.0),
                    ]),
                )
                .with_meta("Time Period", "May 3 - May 7, 2025")
                .with_meta("Data Source", "Product Analytics")
                .with_meta("Total Users Affected", "~2,400 users")
                .with_meta("Average Drop", "15%")],
            ),
            (
                Support,
                vec![SourceRecord::new(
                    "15 support tickets reported checkout button not working on mobile.",
                    "Support Ticket Details",
                    "Support tickets related to checkout issues on May 5-6",
                    list(&[
                        "Ticket #4582: 'Unable to complete checkout on iPhone 13, button doesn't do anything' (May 5, 14:23)",
                        "Ticket #4583: 'Checkout broken on mobile app' (May 5, 14:45)",
                        "Ticket #4587: 'Can't check out on my Android phone, tapping button does nothing' (May 5, 15:12)",
                        "Ticket #4590: 'The checkout button stopped working on my phone' (May 5, 15:38)",
                        "Ticket #4591: 'Unable to complete purchase on mobile' (May 5, 15:40)",
                    ]),
                )
                .with_meta("Ticket Volume", "15 related tickets")
                .with_meta("First Reported", "May 5, 14:23")
                .with_meta("Affected Platforms", "Primarily mobile devices")
                .with_meta("Common Issue", "Unresponsive checkout button")],
            ),
            (
                Releases,
                vec![SourceRecord::new(
                    "Release v2.5.1 deployed at 13:45 on May 5th included mobile checkout UI changes.",
                    "Release Log Details",
                    "Details of deployment v2.5.1 on May 5th",
                    text("# Release v2.5.1\n\
                          Deployed: May 5, 2025 13:45 UTC\n\
                          Changes:\n\
                          - Updated checkout button rendering on mobile devices\n\
                          - Improved loading time for product catalog\n\
                          - Fixed search functionality on category pages\n\
                          - Added new payment provider integration\n\
                          - Refactored checkout process code for mobile devices\n\
                          \n\
                          Deployment Notes:\n\
                          - Progressive rollout started at 13:45\n\
                          - 100% rollout completed by 14:00\n\
                          - No deployment errors reported\n\
                          - No immediate alerts triggered"),
                )
                .with_meta("Release Version", "v2.5.1")
                .with_meta("Deployment Time", "May 5, 13:45 UTC")
                .with_meta("Deployment Type", "Progressive rollout")
                .with_meta("Related Changes", "Mobile checkout UI updates")],
            ),
            (
                // Held for drill-down only; internal comms are not relevant here.
                Internal,
                vec![SourceRecord::new(
                    "Mobile team discussed potential issues with new checkout button implementation.",
                    "Internal Communication Log",
                    "Chat conversation between development team members on May 5th",
                    text("[13:52] @sarah_dev: v2.5.1 is fully deployed now, everything looks good on the monitoring dashboard\n\
                          [14:15] @mike_mobile: did we test the new checkout button implementation on older Android devices?\n\
                          [14:18] @sarah_dev: I tested on the devices we have in the office, seemed fine\n\
                          [14:23] @mike_mobile: @alex_qa did you run the checkout test scenario on Android 10?\n\
                          [14:30] @alex_qa: I focused on iOS and newer Android versions since that's most of our user base\n\
                          [14:42] @mike_mobile: seeing some early reports of checkout issues on mobile\n\
                          [14:45] @sarah_dev: checking now, might be related to the event handler change\n\
                          [15:01] @alex_qa: confirmed issue on older Android. The button appears but doesn't trigger the event\n\
                          [15:05] @mike_mobile: working on a hotfix now"),
                )
                .with_meta("Conversation Time", "May 5, 13:52 - 15:05")
                .with_meta("Team", "Mobile Development")
                .with_meta("Key Participants", "Sarah, Mike, Alex")
                .with_meta("Identified Issue", "Event handler for older Android devices")],
            ),
        ]),
    }
}

/// API error rate spike on May 6th.
///
/// Relevant sources: analytics, internal, infrastructure.
pub fn api_error_spike() -> ScenarioDefinition {
    use SourceKey::{Analytics, Infrastructure, Internal};

    ScenarioDefinition {
        scenario: Scenario {
            key: "api-error-spike".to_string(),
            title: "API Error Rate Spike (May 6th)".to_string(),
            query: "What caused the API error spike on May 6th?".to_string(),
            description: "Analyze the sudden increase in API error rates that occurred on May 6th.".to_string(),
        },
        keywords: keywords(&[
            "api error",
            "api ",
            "error rate",
            "endpoint",
            "5xx",
            "timeout",
            "latency",
            "database",
        ]),
        sources: vec![
            profile(
                Analytics,
                "API error rate jumped from 0.5% to 15% at 09:30 on May 6th and recovered by 11:00.",
                "Looking for the onset and duration of the error spike",
                "The spike lasted about 90 minutes and recovered without a release, which suggests an operational cause.",
            ),
            profile(
                Internal,
                "Backend team identified an unauthorized analytics job was causing database connection pool saturation.",
                "Looking for team discussion about the incident",
                "The backend team tied the errors to a newly deployed analytics job querying the production database.",
            ),
            profile(
                Infrastructure,
                "Database connection pool reached 100% utilization during the incident period.",
                "Looking for resource saturation during the incident window",
                "Connection pool usage hit 100% exactly when errors began, so database capacity is the bottleneck.",
            ),
        ],
        intro: IntroScript {
            parse: "Detected key terms: \"API error\", \"spike\", \"May 6th\"".to_string(),
            identify: "KPI: API error rate".to_string(),
            determine: "Time window: May 6th, 09:00-11:00".to_string(),
            thought: "Error spikes that recover on their own often come from resource exhaustion or a bad deployment. I'll line up the error curve with infrastructure metrics and team communication.".to_string(),
        },
        rules: vec![
            rule(
                &[Analytics, Internal, Infrastructure],
                ConfidenceLevel::High,
                95,
                "Database connection pool saturation caused by unauthorized analytics job deployment.",
                None,
                "The 09:30 error onset matches connection pool saturation and the analytics job deployment discussed by the backend team.",
            ),
            rule(
                &[Analytics, Infrastructure],
                ConfidenceLevel::Medium,
                70,
                "Database connection pool saturation caused API errors.",
                Some("Internal communication data missing for attribution."),
                "The error spike matches database connection pool saturation, but the source of the extra load is unknown.",
            ),
            rule(
                &[Analytics, Internal],
                ConfidenceLevel::Medium,
                65,
                "Analytics job deployment likely caused API errors.",
                Some("Infrastructure metrics missing for confirmation."),
                "The error spike follows the analytics job deployment reported by the backend team, but resource metrics are unavailable.",
            ),
            rule(
                &[Analytics],
                ConfidenceLevel::Low,
                25,
                "API error rate spiked to 15% for approximately 90 minutes on May 6th.",
                Some("Insufficient data to determine root cause."),
                "Only the error rate is available, so the spike cannot be correlated with any cause.",
            ),
        ],
        fallback: rule(
            &[],
            ConfidenceLevel::VeryLow,
            15,
            "Insufficient data to determine root cause of API error spike.",
            Some("Critical data sources are missing from analysis."),
            "Not enough relevant sources are active to correlate the error spike with a cause.",
        ),
        records: BTreeMap::from([
            (
                Analytics,
                vec![SourceRecord::new(
                    "API error rate jumped from 0.5% to 15% at 09:30 on May 6th.",
                    "Analytics Data - API Error Rate",
                    "API error rate from May 5th to May 7th",
                    chart(&[
                        ("May 5 (AM)", 0.4),
                        ("May 5 (PM)", 0.5),
                        ("May 6 (09:00)", 0.5),
                        ("May 6 (09:30)", 15.0),
                        ("May 6 (10:00)", 14.8),
                        ("May 6 (10:30)", 5.2),
                        ("May 6 (11:00)", 0.6),
                        ("May 7", 0.5),
                    ]),
                )
                .with_meta("Time Period", "May 5 - May 7, 2025")
                .with_meta("Data Source", "API Monitoring")
                .with_meta("Peak Error Rate", "15%")
                .with_meta("Duration", "Approximately 90 minutes")],
            ),
            (
                Internal,
                vec![SourceRecord::new(
                    "Backend team identified database connection pool saturation as the cause.",
                    "Internal Communication Log",
                    "Chat conversation between backend team members on May 6th",
                    text("[09:32] @alertbot: ALERT: API error rate above 10% threshold\n\
                          [09:33] @jenny_backend: looking into it now\n\
                          [09:35] @dave_ops: seeing a lot of timeout errors, checking server logs\n\
                          [09:38] @jenny_backend: database connection pool is maxed out\n\
                          [09:42] @dave_ops: seeing unusual query patterns, looks like someone deployed something?\n\
                          [09:45] @carlos_data: oh no, my bad - I just deployed a new analytics job that queries the production DB\n\
                          [09:47] @jenny_backend: @carlos_data that's definitely causing the issue, can you roll it back?\n\
                          [09:50] @carlos_data: rolling back now\n\
                          [10:05] @dave_ops: still seeing high connection usage but it's starting to drop\n\
                          [10:15] @jenny_backend: should we increase the connection pool size anyway?\n\
                          [10:18] @dave_ops: let's do that as a precaution, PR coming\n\
                          [10:35] @alertbot: RESOLVED: API error rate back below threshold"),
                )
                .with_meta("Conversation Time", "May 6, 09:32 - 10:35")
                .with_meta("Team", "Backend & Operations")
                .with_meta("Key Participants", "Jenny, Dave, Carlos")
                .with_meta("Root Cause", "Analytics job consuming database connections")],
            ),
            (
                Infrastructure,
                vec![SourceRecord::new(
                    "Database connection pool saturated at 09:30, resolved by 10:30.",
                    "Infrastructure Status Details",
                    "Database and server metrics from May 6th incident",
                    chart(&[
                        ("09:00", 45.0),
                        ("09:15", 48.0),
                        ("09:30", 98.0),
                        ("09:45", 100.0),
                        ("10:00", 100.0),
                        ("10:15", 95.0),
                        ("10:30", 60.0),
                        ("10:45", 42.0),
                    ]),
                )
                .with_meta("Metric", "Database Connection Pool Usage (%)")
                .with_meta("Time Period", "May 6, 09:00 - 10:45")
                .with_meta("Peak Usage", "100% (saturated)")
                .with_meta("Normal Range", "30-50%")],
            ),
        ]),
    }
}

/// App store rating drop on May 8th.
///
/// Relevant sources: appstore, support, releases.
pub fn app_rating_drop() -> ScenarioDefinition {
    use SourceKey::{AppStore, Releases, Support};

    ScenarioDefinition {
        scenario: Scenario {
            key: "app-rating-drop".to_string(),
            title: "App Store Rating Drop (May 8th)".to_string(),
            query: "Why did our app store rating drop on May 8th?".to_string(),
            description: "Investigate the fall in average app store rating that began on May 8th.".to_string(),
        },
        keywords: keywords(&["rating", "review", "app store", "appstore", "stars"]),
        sources: vec![
            profile(
                AppStore,
                "Average rating fell from 4.6 to 3.9 stars within two days of May 8th, driven by 1-star reviews mentioning login crashes.",
                "Looking for rating changes and recurring complaints in recent reviews",
                "Most new 1-star reviews mention the app crashing at login on iOS, so the drop is tied to a specific defect.",
            ),
            profile(
                Support,
                "Support received 42 tickets about the iOS app crashing during login, all on iOS 16.",
                "Looking for tickets about crashes or sign-in problems",
                "Crash tickets are limited to iOS 16, which narrows the defect to one platform version.",
            ),
            profile(
                Releases,
                "Release v2.6.0 shipped on May 8th at 10:00 with a rewritten authentication screen.",
                "Looking for releases shipped just before the rating drop",
                "v2.6.0 replaced the login screen on the morning the bad reviews started.",
            ),
        ],
        intro: IntroScript {
            parse: "Detected key terms: \"app store rating\", \"drop\", \"May 8th\"".to_string(),
            identify: "KPI: Average app store rating (7-day rolling)".to_string(),
            determine: "Time window: May 7th-10th, compared against May 1st-6th as baseline".to_string(),
            thought: "Rating drops usually follow a release that broke a core flow. I'll read the reviews first, then match the complaints against support tickets and the release log.".to_string(),
        },
        rules: vec![
            rule(
                &[AppStore, Support, Releases],
                ConfidenceLevel::High,
                85,
                "Release v2.6.0 introduced a login crash on iOS 16 that drove a wave of 1-star reviews.",
                None,
                "The rating drop, the iOS 16 crash tickets and the v2.6.0 login rewrite all start on the morning of May 8th.",
            ),
            rule(
                &[AppStore, Releases],
                ConfidenceLevel::Medium,
                60,
                "Release v2.6.0 likely caused the rating drop through a login defect.",
                Some("Support ticket data missing for platform details."),
                "Reviews complaining about login began right after v2.6.0 shipped, but the affected platforms are unconfirmed.",
            ),
            rule(
                &[AppStore, Support],
                ConfidenceLevel::Medium,
                55,
                "A login crash on iOS 16 is driving negative reviews.",
                Some("Release data missing to identify the triggering change."),
                "Reviews and support tickets describe the same iOS login crash, but no release data is available to find the trigger.",
            ),
            rule(
                &[AppStore],
                ConfidenceLevel::Low,
                25,
                "App store rating dropped to 3.9 stars after May 8th due to unknown causes.",
                Some("Insufficient data to determine root cause."),
                "Only the rating trend is available, so the drop cannot be correlated with any cause.",
            ),
        ],
        fallback: rule(
            &[],
            ConfidenceLevel::VeryLow,
            10,
            "Insufficient data to determine root cause of app store rating drop.",
            Some("Critical data sources are missing from analysis."),
            "Not enough relevant sources are active to correlate the rating drop with a cause.",
        ),
        records: BTreeMap::from([
            (
                AppStore,
                vec![SourceRecord::new(
                    "Average rating fell from 4.6 to 3.9 stars between May 7th and May 10th.",
                    "App Store Rating Trend",
                    "Daily average rating across iOS and Android stores",
                    chart(&[
                        ("May 6", 4.6),
                        ("May 7", 4.6),
                        ("May 8", 4.3),
                        ("May 9", 4.0),
                        ("May 10", 3.9),
                    ]),
                )
                .with_meta("Time Period", "May 6 - May 10, 2025")
                .with_meta("Data Source", "App Store Connect, Google Play Console")
                .with_meta("New 1-star Reviews", "318")
                .with_meta("Most Cited Issue", "Crash at login")],
            ),
            (
                Support,
                vec![SourceRecord::new(
                    "42 tickets reported the iOS app crashing during login since May 8th.",
                    "Support Ticket Details",
                    "Support tickets related to app crashes on May 8-10",
                    list(&[
                        "Ticket #5120: 'App closes as soon as I tap Sign In' (May 8, 10:41)",
                        "Ticket #5124: 'Crashes on login after update, iPhone 12 iOS 16.4' (May 8, 11:02)",
                        "Ticket #5131: 'Can't log in anymore, app just quits' (May 8, 12:17)",
                        "Ticket #5140: 'Login screen crash since this morning's update' (May 8, 13:55)",
                    ]),
                )
                .with_meta("Ticket Volume", "42 related tickets")
                .with_meta("First Reported", "May 8, 10:41")
                .with_meta("Affected Platforms", "iOS 16.x only")
                .with_meta("Common Issue", "Crash when submitting login form")],
            ),
            (
                Releases,
                vec![SourceRecord::new(
                    "Release v2.6.0 shipped at 10:00 on May 8th with a new login screen.",
                    "Release Log Details",
                    "Details of app release v2.6.0 on May 8th",
                    text("# Release v2.6.0\n\
                          Released: May 8, 2025 10:00 UTC\n\
                          Changes:\n\
                          - Rewrote authentication screen with new design system components\n\
                          - Added biometric sign-in prompt\n\
                          - Updated analytics SDK\n\
                          \n\
                          Release Notes:\n\
                          - Phased release disabled, shipped to 100% of users\n\
                          - Tested on iOS 17 and Android 13-14"),
                )
                .with_meta("Release Version", "v2.6.0")
                .with_meta("Release Time", "May 8, 10:00 UTC")
                .with_meta("Rollout", "Full release")
                .with_meta("Related Changes", "Authentication screen rewrite")],
            ),
        ]),
    }
}

/// All built-in scenarios in inference priority order.
pub fn all() -> Vec<ScenarioDefinition> {
    vec![checkout_drop(), api_error_spike(), app_rating_drop()]
}
