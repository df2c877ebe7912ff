use memocall::{DynMemo, Value};

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .init();

    let total = DynMemo::new(|args: &[Value]| -> Result<i64, String> {
        let mut sum = 0;
        for arg in args {
            match arg {
                Value::Int(i) => sum += i,
                Value::List(items) | Value::Tuple(items) => {
                    sum += items.iter().filter_map(Value::as_int).sum::<i64>()
                }
                other => return Err(format!("cannot add {}", other)),
            }
        }
        Ok(sum)
    });

    let hashable = [Value::Int(1), Value::Tuple(vec![Value::Int(2), Value::Int(3)])];
    let unhashable = [Value::Int(1), Value::List(vec![Value::Int(2), Value::Int(3)])];

    for args in &[&hashable[..], &hashable[..], &unhashable[..], &unhashable[..]] {
        let shown: Vec<String> = args.iter().map(ToString::to_string).collect();
        println!("total({}) = {:?}", shown.join(", "), total.call(args));
    }
    println!("total(\"x\") = {:?}", total.call(&[Value::from("x")]));
    println!("{}", total.stats());
}
