//! Static executive report view.

/// A headed block of the report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportSection {
    pub heading: &'static str,
    pub paragraphs: &'static [&'static str],
}

pub const REPORT_TITLE: &str = "Executive Summary: Telesales Performance";

pub const REPORT_SECTIONS: &[ReportSection] = &[
    ReportSection {
        heading: "The Bottom Line",
        paragraphs: &[
            "An end-to-end analysis of 12 weeks of telesales data shows agents generating $61.73K in GMV, with a clear opportunity to optimize operations. Agent effort is misaligned after the 3rd call attempt, and revenue is concentrated in a handful of top campaigns.",
        ],
    },
    ReportSection {
        heading: "Insight 1: The Diminishing Returns of Effort",
        paragraphs: &[
            "The Data: Connection rates and conversions peak at Attempts 1 and 2.",
            "The Drop-off: Significant operational waste occurs on Attempts 4 and beyond. Agents spend hours dialing unresponsive leads.",
            "The Action: Implement a hard cap on the dialer to reallocate agent hours to fresh, high-intent leads.",
        ],
    },
    ReportSection {
        heading: "Insight 2: Campaign & Agent ROI",
        paragraphs: &[
            "Revenue Concentration: GMV is highly dependent on the top 5 campaigns, a classic Pareto distribution.",
            "Agent Variances: Connect rates are uniform across the floor, but conversion rates vary heavily by agent.",
            "The Action: Trace top lead sources and implement targeted peer-to-peer sales coaching.",
        ],
    },
    ReportSection {
        heading: "Strategic Next Steps",
        paragraphs: &[
            "1. Operations (Dialer Cap): Institute a 3-attempt hard cap on the dialer to optimize average talk time and focus on early-funnel qualified leads.",
            "2. Marketing Alignment: Align with the growth team to scale the lead sources feeding the Top 5 GMV campaigns.",
            "3. Enablement: Pair agents below the healthy conversion threshold with top performers for closing and objection-handling coaching.",
        ],
    },
];

/// The report as plain text
pub fn render_report() -> String {
    let mut blocks = vec![REPORT_TITLE.to_string(), "=".repeat(REPORT_TITLE.len())];
    for section in REPORT_SECTIONS {
        blocks.push(String::new());
        blocks.push(format!("## {}", section.heading));
        blocks.extend(section.paragraphs.iter().map(|p| p.to_string()));
    }
    blocks.join("\n")
}
