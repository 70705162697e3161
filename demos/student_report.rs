//! Student report built from a deferred stream
//!
//! Pipeline:
//! 1. Source: ten students with three scores each
//! 2. Filter: keep students older than 18
//! 3. Sort: highest average first
//! 4. Terminal: print the ranking, group by age, sum all scores
//!
//! Usage: cargo run --example student_report

use deferred_stream::{Result as StreamResult, Stream};

#[derive(Debug, Clone)]
struct Student {
    name: &'static str,
    age: u32,
    scores: [u32; 3],
}

impl Student {
    fn average(&self) -> f64 {
        self.scores.iter().sum::<u32>() as f64 / self.scores.len() as f64
    }
}

fn students() -> Vec<Student> {
    let names = ["Tom", "Kate", "Lucy", "Jim", "Jack", "King", "Lee", "Mask", "Ann", "Bob"];
    names
        .into_iter()
        .enumerate()
        .map(|(i, name)| {
            let i = i as u32;
            Student {
                name,
                age: 15 + (i * 7) % 11,
                scores: [60 + (i * 13) % 40, 60 + (i * 29) % 40, 60 + (i * 37) % 40],
            }
        })
        .collect()
}

fn main() -> StreamResult<()> {
    println!("Student Report");
    println!("==============");

    let adults = Stream::from_vec(students())
        .filter(|s| s.age > 18)
        .sort(|a, b| a.average() > b.average())
        .call(|| println!("(ranking computed)"));

    adults.for_each_indexed(|s, i| {
        println!("{:2}. {:<5} age {:2}  avg {:.1}", i + 1, s.name, s.age, s.average());
    })?;

    let by_age = adults.group(|s| (s.age, s.name))?;
    let mut ages: Vec<_> = by_age.keys().copied().collect();
    ages.sort_unstable();
    println!("\nBy age:");
    for age in ages {
        println!("  {}: {:?}", age, by_age[&age]);
    }

    println!("\n{}", adults.metrics_summary());

    let total = adults
        .reset()
        .flat_map(|s| s.scores)
        .reduce(0, |sum, score| sum + score)?;
    println!("\nSum of all scores: {}", total);

    Ok(())
}
