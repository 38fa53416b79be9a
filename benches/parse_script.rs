//! Script parsing and grouping benchmarks.
//! Run: cargo bench

use chrono::{FixedOffset, TimeZone};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use fakechat::group::group_messages;
use fakechat::script::{parse_conversation, parse_conversation_with_mode, ParseMode};

fn sample_script(lines: usize) -> String {
    let mut script = String::new();
    for i in 0..lines {
        let marker = if i % 3 == 0 { '<' } else { '>' };
        if i % 10 == 0 {
            script.push_str(&format!("{marker} line {i} with a time (1{}:{:02})\n", i % 10, i % 60));
        } else {
            script.push_str(&format!("{marker} line {i} plain text body\n"));
        }
        if i % 25 == 0 {
            script.push_str("a note that is not a message\n");
        }
    }
    script
}

fn bench_parse(c: &mut Criterion) {
    let now = FixedOffset::east_opt(0)
        .expect("utc offset")
        .with_ymd_and_hms(2024, 6, 1, 8, 30, 0)
        .single()
        .expect("valid timestamp");
    let script = sample_script(2_000);

    let mut group = c.benchmark_group("parse_script");
    group.sample_size(50);

    group.bench_function("carry_2000_lines", |b| {
        b.iter(|| black_box(parse_conversation(black_box(&script), now)))
    });
    group.bench_function("stamp_now_2000_lines", |b| {
        b.iter(|| {
            black_box(parse_conversation_with_mode(
                black_box(&script),
                now,
                ParseMode::StampNow,
            ))
        })
    });

    let messages = parse_conversation(&script, now);
    group.bench_function("group_2000_messages", |b| {
        b.iter(|| black_box(group_messages(black_box(&messages))))
    });

    group.finish();
}

criterion_group!(benches, bench_parse);
criterion_main!(benches);
