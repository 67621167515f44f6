#![no_main]

use datamgr::{Topic, TopicPattern};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    let Ok(pattern) = data.parse::<TopicPattern>() else {
        return;
    };
    let rendered = pattern.to_string();
    let reparsed: TopicPattern = rendered.parse().expect("rendered pattern parses");
    assert_eq!(reparsed.to_string(), rendered);

    // The source text read as a literal topic is always selected.
    assert!(pattern.matches(&Topic::parse(data)));
});
