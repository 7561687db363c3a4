use criterion::{Criterion, criterion_group, criterion_main};
use lulu_engine::editing::{
    Mutation, Palette, Splice, Suggestion, SuggestionStore, build_decorations,
};

fn generate_manuscript(paragraphs: usize) -> String {
    "The quick brown fox jumps over the lazy dog while the river keeps running.\n\n"
        .repeat(paragraphs)
}

/// One suggestion on every "quick" in the manuscript
fn generate_suggestions(text: &str) -> Vec<Suggestion> {
    text.match_indices("quick")
        .map(|(at, word)| Suggestion::new(at..at + word.len(), word, "fast"))
        .collect()
}

fn bench_remap_operations(c: &mut Criterion) {
    let mut group = c.benchmark_group("remap");
    group.sample_size(10);

    let text = generate_manuscript(500);
    let suggestions = generate_suggestions(&text);
    let store = SuggestionStore::new(text.as_str())
        .add_suggestions(suggestions.clone())
        .unwrap();

    group.bench_function("apply_mutation", |b| {
        let edited = format!("Once. {text}");
        let mutation = Mutation::single(0, Splice::insert(0, 6));
        b.iter(|| {
            let next = store
                .apply_mutation(std::hint::black_box(&mutation), edited.as_str())
                .unwrap();
            std::hint::black_box(next);
        });
    });

    group.bench_function("accept", |b| {
        let id = suggestions[suggestions.len() / 2].id;
        b.iter(|| {
            let transition = store.accept(std::hint::black_box(id)).unwrap();
            std::hint::black_box(transition);
        });
    });

    group.bench_function("build_decorations", |b| {
        let palette = Palette::default();
        b.iter(|| {
            let set = build_decorations(&text, std::hint::black_box(&suggestions), &palette);
            std::hint::black_box(set);
        });
    });

    group.finish();
}

criterion_group!(benches, bench_remap_operations);
criterion_main!(benches);
