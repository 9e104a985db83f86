use console::Style;
use flume::Receiver;

use crate::asserter::Report;
use crate::asserter::TestResult;
use crate::runner::Phase;

pub struct OutPutter;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl Summary {
    pub fn record(&mut self, result: TestResult) {
        match result {
            TestResult::Pass => self.passed += 1,
            TestResult::Fail => self.failed += 1,
            TestResult::Skip => self.skipped += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.passed + self.failed + self.skipped
    }
}

/// Marks setup and teardown lines.
fn phase_tag(phase: Phase) -> String {
    match phase {
        Phase::Setup => format!("{} ", console::style("[setup]").dim()),
        Phase::Teardown => format!("{} ", console::style("[teardown]").dim()),
        Phase::Test => String::new(),
    }
}

impl OutPutter {
    pub async fn start(rx: Receiver<Report>, n_tests: usize) -> Summary {
        let style = Style::new().bold().cyan();
        let open_text = style.apply_to(format!("Found {n_tests} tests: Running..."));

        println!("{open_text}");

        let mut i = 1;
        let mut summary = Summary::default();
        let mut current_suite = String::new();
        let mut failed_tests: Vec<Report> = vec![];

        while let Ok(report) = rx.recv_async().await {
            if report.suite != current_suite {
                println!();
                println!("{}", console::style(&report.suite).bold().underlined());
                current_suite.clone_from(&report.suite);
            }

            summary.record(report.result.status);

            let line = format!(
                "[{i}/{n_tests}] {}{} {} {}",
                phase_tag(report.phase),
                console::style(&report.method).cyan(),
                report.url,
                console::style(&report.name).bold()
            );

            match report.result.status {
                TestResult::Pass => println!("{line}: {}", console::style("PASS!").green().bold()),
                TestResult::Skip => {
                    println!("{line}: {}", console::style("SKIPPED").yellow().bold())
                }
                TestResult::Fail => {
                    println!("{line}: {}", console::style("FAILED!").red().bold());
                    failed_tests.push(report);
                }
            }

            i += 1;
        }

        println!();
        if failed_tests.is_empty() {
            println!("{}", console::style("All tests passed! 🎉").bold().green());
        } else {
            println!(
                "{}",
                console::style("Summary of Failed Tests:").bold().red()
            );
            for (idx, report) in failed_tests.iter().enumerate() {
                println!(
                    "\n{}. {} > {} ({} {})\n{}",
                    idx + 1,
                    report.suite,
                    report.name,
                    report.method,
                    report.url,
                    report.result
                );
            }
        }

        println!(
            "\n{} passed, {} failed, {} skipped",
            console::style(summary.passed).green(),
            console::style(summary.failed).red(),
            console::style(summary.skipped).yellow()
        );

        summary
    }
}
