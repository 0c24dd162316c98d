//! Stream a JSON sample array incrementally without loading it whole

use graphfeed::source::{ArrayScanner, ScanEvent};

fn main() {
    let document = br#"[
        {"link": ["l0"], "path": ["p0"]},
        {"link": ["l0", "l1"], "path": ["p0"]},
        {"link": ["l0"], "path": ["p0", "p1"]}
    ]"#;

    // Feed the scanner in small chunks, as a file reader would
    let mut scanner = ArrayScanner::new();
    let mut samples = 0;

    for chunk in document.chunks(16) {
        scanner.push(chunk);
        loop {
            match scanner.next_event() {
                ScanEvent::Parsed(value) => {
                    samples += 1;
                    println!("sample {}: {}", samples, value);
                }
                ScanEvent::NeedMoreInput => break,
                ScanEvent::EndOfArray => {
                    println!("end of array after {} samples", samples);
                    return;
                }
                ScanEvent::Malformed(msg) => {
                    eprintln!("malformed stream: {}", msg);
                    return;
                }
            }
        }
    }
}
