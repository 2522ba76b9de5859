use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tagsieve::Sieve;

fn bench_sieve() -> Sieve {
    let mut sieve = Sieve::new();
    sieve.allow_tags(["b", "i", "u", "a", "ul", "ol", "li", "br", "pre", "code"]);
    sieve.short_tags(["br"]).unwrap();
    sieve.preformatted_tags(["code"]).unwrap();
    sieve.allow_attrs("a", ["href", "rel"]).unwrap();
    sieve.attr_values("a", "href", ["#link"]).unwrap();
    sieve.require_attrs("a", ["href"]).unwrap();
    sieve.default_attr("a", "rel", "nofollow").unwrap();
    sieve.cut_tags(["script", "style"]);
    sieve.tag_children("ul", ["li"]).unwrap();
    sieve.tag_children("ol", ["li"]).unwrap();
    sieve.parent_only_tags(["ul", "ol"]).unwrap();
    sieve.child_only_tags(["li"]).unwrap();
    sieve
}

fn gen_tagged_doc(n: usize) -> String {
    (0..n)
        .map(|i| format!("<b>para {i}</b> with <i>markup</i> and <u>depth</u>\n"))
        .collect()
}

fn gen_text_doc(n: usize) -> String {
    (0..n)
        .map(|i| format!("plain prose line {i}, with commas - and dashes.\n"))
        .collect()
}

fn gen_typography_doc(n: usize) -> String {
    (0..n)
        .map(|i| format!("\"quote {i}\" says http://example.test/{i} - really!\n"))
        .collect()
}

fn gen_list_doc(n: usize) -> String {
    let mut s = String::from("<ul>\n");
    for i in 0..n {
        s.push_str(&format!("<li>item {i}</li>\n"));
    }
    s.push_str("</ul>\n");
    s
}

fn gen_hostile_doc(n: usize) -> String {
    (0..n)
        .map(|i| {
            format!(
                "<script>evil({i})</script><a href=\"javascript:x()\">x</a><b onclick=h>t</b>\n"
            )
        })
        .collect()
}

fn bench_parse(c: &mut Criterion) {
    let sieve = bench_sieve();

    let mut group = c.benchmark_group("parse");
    for (name, doc) in [
        ("tagged", gen_tagged_doc(500)),
        ("text", gen_text_doc(500)),
        ("typography", gen_typography_doc(500)),
        ("list", gen_list_doc(1000)),
        ("hostile", gen_hostile_doc(500)),
    ] {
        group.throughput(criterion::Throughput::Bytes(doc.len() as u64));
        group.bench_function(name, |b| {
            b.iter(|| sieve.parse(black_box(&doc)));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_parse);
criterion_main!(benches);
