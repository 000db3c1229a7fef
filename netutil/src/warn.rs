use crate::Timer;

// - If it doesn't make sense to plumb a Timer into a call, return Warn<T>.
// - If a Timer is available, use get() to move the warnings into it.
pub struct Warn<T> {
    value: T,
    warnings: Vec<String>,
}

impl<T> Warn<T> {
    pub fn warnings(value: T, warnings: Vec<String>) -> Warn<T> {
        Warn { value, warnings }
    }

    pub fn get(self, timer: &mut Timer) -> T {
        for line in self.warnings {
            timer.warn(line);
        }
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warnings_move_into_timer() {
        let mut timer = Timer::new("test");
        let value = Warn::warnings(5, vec!["a".to_string(), "b".to_string()]).get(&mut timer);
        assert_eq!(value, 5);
        assert_eq!(timer.warnings().len(), 2);
    }
}
