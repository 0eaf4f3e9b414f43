//! Interactive terminal loop for a running exam.

use exam_core::model::{ChoiceLabel, SessionSummary};
use services::{Advance, ExamEngine, ExamError, ExamSnapshot, NavigationController, Screen};
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Input {
    Pick(ChoiceLabel),
    Next,
    Quit,
    Unknown,
}

fn parse_input(line: &str) -> Input {
    match line.trim().to_ascii_lowercase().as_str() {
        "" | "n" => Input::Next,
        "q" => Input::Quit,
        other => other.parse::<ChoiceLabel>().map_or(Input::Unknown, Input::Pick),
    }
}

fn prompt_hint(snapshot: &ExamSnapshot) -> &'static str {
    match (snapshot.can_advance(), snapshot.is_last()) {
        (false, _) => "a-e to answer, q to quit",
        (true, false) => "Enter for the next question",
        (true, true) => "Enter to finish the exam",
    }
}

fn render(snapshot: &ExamSnapshot) {
    println!();
    println!(
        "Q.{} / {}    {}",
        snapshot.position(),
        snapshot.total,
        snapshot.elapsed_display()
    );
    println!("{}", snapshot.question.prompt());
    if let Some(image) = snapshot.question.image_ref() {
        println!("  [image: {image}]");
    }
    for (index, choice) in snapshot.question.choices().iter().enumerate() {
        let marker = if snapshot.selected == Some(index) { '*' } else { ' ' };
        println!(" {marker} {}) {}", choice.label.as_char().to_ascii_lowercase(), choice.text);
    }
    println!("({})", prompt_hint(snapshot));
}

fn print_result(summary: &SessionSummary, min_correct: Option<u32>) {
    println!();
    println!("{}", summary.selection());
    println!(
        "Result: {}/{} ({}%) in {}",
        summary.correct_count(),
        summary.total(),
        summary.percent(),
        exam_core::time::format_elapsed(summary.elapsed_seconds())
    );
    match min_correct {
        Some(min) if summary.meets_minimum(Some(min)) => println!("Passed (minimum {min})."),
        Some(min) => println!("Not passed (minimum {min})."),
        None => {}
    }
}

/// Drive `engine` from stdin until the exam finishes or the user quits.
///
/// End of input abandons the exam.
pub async fn run(
    engine: &mut ExamEngine,
    nav: &NavigationController,
    first: ExamSnapshot,
) -> Result<(), Box<dyn std::error::Error>> {
    let min_correct = first.min_correct;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut current = first;
    render(&current);

    let outcome = loop {
        let Some(line) = lines.next_line().await? else {
            engine.abandon();
            break None;
        };
        match parse_input(&line) {
            Input::Quit => {
                engine.abandon();
                break None;
            }
            Input::Pick(label) => {
                let index = current
                    .question
                    .choices()
                    .iter()
                    .position(|choice| choice.label == label);
                match index.map(|i| engine.select_answer(i)) {
                    Some(Ok(snapshot)) => {
                        current = snapshot;
                        render(&current);
                    }
                    Some(Err(err)) => return Err(err.into()),
                    None => println!("No choice {label} on this question."),
                }
            }
            Input::Next => match engine.advance() {
                Ok(Advance::Next(snapshot)) => {
                    current = snapshot;
                    render(&current);
                }
                Ok(Advance::Finished(summary)) => break Some(summary),
                Err(ExamError::QuestionNotAnswered { .. }) => {
                    println!("Pick an answer first.");
                }
                Err(err) => return Err(err.into()),
            },
            Input::Unknown => println!("Use a-e to answer, Enter to go on, q to quit."),
        }
    };

    match (nav.current(), outcome) {
        (Screen::Result, Some(summary)) => {
            print_result(&summary, min_correct);
            nav.go(Screen::Home)?;
        }
        _ => println!("Exam abandoned."),
    }
    Ok(())
}
